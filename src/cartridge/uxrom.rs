use crate::cartridge::mapper::{ChrMemory, PRG_BANK_SIZE, open_bus};
use crate::cartridge::{Mapper, MapperInfo, Mirroring, Nametables};

/// UxROM mapper (Mapper 2)
///
/// - $8000-$BFFF: switchable 16KB PRG bank
/// - $C000-$FFFF: fixed to the last 16KB bank
/// - 8KB CHR-RAM (CHR-ROM if the image has one)
/// - Any write to $8000-$FFFF selects the bank
pub struct UxromMapper {
    prg_rom: Vec<u8>,
    chr: ChrMemory,
    nametables: Nametables,
    bank_select: u8,
}

impl UxromMapper {
    pub fn new(prg_rom: Vec<u8>, chr_rom: Vec<u8>, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr: ChrMemory::new(chr_rom),
            nametables: Nametables::new(mirroring),
            bank_select: 0,
        }
    }

    fn bank_count(&self) -> usize {
        (self.prg_rom.len() / PRG_BANK_SIZE).max(1)
    }
}

impl Mapper for UxromMapper {
    fn read_cpu(&self, addr: u16) -> u8 {
        if addr < 0x8000 || self.prg_rom.is_empty() {
            return open_bus(addr);
        }
        let bank = if addr < 0xC000 {
            self.bank_select as usize % self.bank_count()
        } else {
            self.bank_count() - 1
        };
        let index = bank * PRG_BANK_SIZE + (addr as usize & (PRG_BANK_SIZE - 1));
        self.prg_rom[index % self.prg_rom.len()]
    }

    fn write_cpu(&mut self, addr: u16, value: u8) {
        if addr >= 0x8000 {
            self.bank_select = value;
        }
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
            name: "UxROM",
            aliases: &["mapper 2", "UNROM", "UOROM"],
            description: "Switchable 16KB PRG bank with the last bank fixed",
        }
    }
}
