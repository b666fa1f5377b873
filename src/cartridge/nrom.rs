use crate::cartridge::mapper::{ChrMemory, PRG_RAM_SIZE, open_bus};
use crate::cartridge::{Mapper, MapperInfo, Mirroring, Nametables};

/// NROM mapper (Mapper 0)
///
/// No bank switching.
/// - 16KB or 32KB PRG ROM (16KB is mirrored at $C000)
/// - Optional 8KB PRG-RAM at $6000-$7FFF (Family Basic style boards)
/// - 8KB CHR ROM, or CHR-RAM when the image has none
/// - Mirroring soldered at manufacture time
pub struct NromMapper {
    prg_rom: Vec<u8>,
    prg_ram: Option<Vec<u8>>,
    chr: ChrMemory,
    nametables: Nametables,
}

impl NromMapper {
    pub fn new(
        prg_rom: Vec<u8>,
        chr_rom: Vec<u8>,
        mirroring: Mirroring,
        has_prg_ram: bool,
    ) -> Self {
        Self {
            prg_rom,
            prg_ram: has_prg_ram.then(|| vec![0; PRG_RAM_SIZE]),
            chr: ChrMemory::new(chr_rom),
            nametables: Nametables::new(mirroring),
        }
    }
}

impl Mapper for NromMapper {
    fn read_cpu(&self, addr: u16) -> u8 {
        match (addr, &self.prg_ram) {
            (0x6000..=0x7FFF, Some(ram)) => ram[(addr - 0x6000) as usize],
            (0x8000..=0xFFFF, _) if !self.prg_rom.is_empty() => {
                // Modulo folds a 16KB image onto both halves
                let offset = (addr - 0x8000) as usize;
                self.prg_rom[offset % self.prg_rom.len()]
            }
            _ => open_bus(addr),
        }
    }

    fn write_cpu(&mut self, addr: u16, value: u8) {
        if let (0x6000..=0x7FFF, Some(ram)) = (addr, &mut self.prg_ram) {
            ram[(addr - 0x6000) as usize] = value;
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
            name: "NROM",
            aliases: &["mapper 0", "NES-NROM-128", "NES-NROM-256"],
            description: "Fixed 16/32KB PRG and 8KB CHR, no bank switching",
        }
    }
}
