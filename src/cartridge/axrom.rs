use crate::cartridge::mapper::{ChrMemory, open_bus};
use crate::cartridge::{Mapper, MapperInfo, Mirroring, Nametables};

const PRG_BANK_SIZE_32K: usize = 0x8000;
const BANK_MASK: u8 = 0b0000_0111;
const NAMETABLE_SELECT: u8 = 0b0001_0000;

/// AxROM mapper (Mapper 7)
///
/// Any write to $8000-$FFFF:
/// - Bits 0-2: select the 32KB PRG bank
/// - Bit 4: one-screen nametable select (0 = lower, 1 = upper)
pub struct AxromMapper {
    prg_rom: Vec<u8>,
    chr: ChrMemory,
    nametables: Nametables,
    bank_select: u8,
}

impl AxromMapper {
    pub fn new(prg_rom: Vec<u8>, chr_rom: Vec<u8>) -> Self {
        Self {
            prg_rom,
            chr: ChrMemory::new(chr_rom),
            nametables: Nametables::new(Mirroring::SingleScreenLower),
            bank_select: 0,
        }
    }
}

impl Mapper for AxromMapper {
    fn read_cpu(&self, addr: u16) -> u8 {
        if addr < 0x8000 || self.prg_rom.is_empty() {
            return open_bus(addr);
        }
        let bank = (self.bank_select & BANK_MASK) as usize;
        let index = bank * PRG_BANK_SIZE_32K + (addr - 0x8000) as usize;
        self.prg_rom[index % self.prg_rom.len()]
    }

    fn write_cpu(&mut self, addr: u16, value: u8) {
        if addr < 0x8000 {
            return;
        }
        self.bank_select = value;
        self.nametables.set_mirroring(if value & NAMETABLE_SELECT != 0 {
            Mirroring::SingleScreenUpper
        } else {
            Mirroring::SingleScreenLower
        });
    }

    fn read_ppu(&self, addr: u16) -> u8 {
        match addr & 0x3FFF {
            0x0000..=0x1FFF => self.chr.read(addr as usize & 0x1FFF),
            _ => self.nametables.read(addr),
        }
    }

    fn write_ppu(&mut self, addr: u16, value: u8) {
        match addr & 0x3FFF {
            0x0000..=0x1FFF => self.chr.write(addr as usize & 0x1FFF, value),
            _ => self.nametables.write(addr, value),
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.nametables.mirroring()
    }

    fn info(&self) -> MapperInfo {
        MapperInfo {
            name: "AxROM",
            aliases: &["mapper 7", "ANROM", "AOROM"],
            description: "32KB PRG switching with one-screen mirroring select",
        }
    }
}
