use crate::cartridge::mapper::open_bus;
use crate::cartridge::{Mapper, MapperInfo, Mirroring};

/// The empty cartridge slot
///
/// Nothing drives either bus, so every read floats to the high byte of the
/// address and writes vanish.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyMapper;

impl Mapper for EmptyMapper {
    fn read_cpu(&self, addr: u16) -> u8 {
        open_bus(addr)
    }

    fn write_cpu(&mut self, _addr: u16, _value: u8) {}

    fn read_ppu(&self, addr: u16) -> u8 {
        open_bus(addr)
    }

    fn write_ppu(&mut self, _addr: u16, _value: u8) {}

    fn mirroring(&self) -> Mirroring {
        Mirroring::Horizontal
    }

    fn info(&self) -> MapperInfo {
        MapperInfo {
            name: "Empty",
            aliases: &["none"],
            description: "No cartridge inserted",
        }
    }
}
