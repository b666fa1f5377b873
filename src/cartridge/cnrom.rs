use crate::cartridge::mapper::{CHR_BANK_SIZE, ChrMemory, open_bus};
use crate::cartridge::{Mapper, MapperInfo, Mirroring, Nametables};

/// CNROM mapper (Mapper 3)
///
/// - 16KB or 32KB fixed PRG ROM
/// - Switchable 8KB CHR ROM bank, selected by any write to $8000-$FFFF
pub struct CnromMapper {
    prg_rom: Vec<u8>,
    chr: ChrMemory,
    nametables: Nametables,
    chr_bank_select: u8,
}

impl CnromMapper {
    pub fn new(prg_rom: Vec<u8>, chr_rom: Vec<u8>, mirroring: Mirroring) -> Self {
        Self {
            prg_rom,
            chr: ChrMemory::new(chr_rom),
            nametables: Nametables::new(mirroring),
            chr_bank_select: 0,
        }
    }

    fn chr_index(&self, addr: u16) -> usize {
        let bank_count = (self.chr.len() / CHR_BANK_SIZE).max(1);
        let bank = self.chr_bank_select as usize % bank_count;
        bank * CHR_BANK_SIZE + (addr as usize & (CHR_BANK_SIZE - 1))
    }
}

impl Mapper for CnromMapper {
    fn read_cpu(&self, addr: u16) -> u8 {
        if addr < 0x8000 || self.prg_rom.is_empty() {
            return open_bus(addr);
        }
        self.prg_rom[(addr - 0x8000) as usize % self.prg_rom.len()]
    }

    fn write_cpu(&mut self, addr: u16, value: u8) {
        if addr >= 0x8000 {
            self.chr_bank_select = value;
        }
    }

    fn read_ppu(&self, addr: u16) -> u8 {
        match addr & 0x3FFF {
            0x0000..=0x1FFF => self.chr.read(self.chr_index(addr)),
            _ => self.nametables.read(addr),
        }
    }

    fn write_ppu(&mut self, addr: u16, value: u8) {
        match addr & 0x3FFF {
            0x0000..=0x1FFF => {
                let index = self.chr_index(addr);
                self.chr.write(index, value);
            }
            _ => self.nametables.write(addr, value),
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.nametables.mirroring()
    }

    fn info(&self) -> MapperInfo {
        MapperInfo {
            name: "CNROM",
            aliases: &["mapper 3"],
            description: "Fixed PRG with a switchable 8KB CHR bank",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banked_chr(banks: usize) -> Vec<u8> {
        (0..banks * CHR_BANK_SIZE).map(|i| (i / CHR_BANK_SIZE) as u8).collect()
    }

    #[test]
    fn test_chr_bank_switching() {
        let mut mapper = CnromMapper::new(vec![0xEA; 0x8000], banked_chr(4), Mirroring::Vertical);
        assert_eq!(mapper.read_ppu(0x0000), 0);
        mapper.write_cpu(0x8000, 2);
        assert_eq!(mapper.read_ppu(0x0000), 2);
        assert_eq!(mapper.read_ppu(0x1FFF), 2);
        mapper.write_cpu(0xFFFF, 5);
        assert_eq!(mapper.read_ppu(0x0000), 1);
    }

    #[test]
    fn test_prg_is_fixed() {
        let mut mapper = CnromMapper::new(vec![0xEA; 0x4000], banked_chr(2), Mirroring::Vertical);
        mapper.write_cpu(0x8000, 1);
        assert_eq!(mapper.read_cpu(0x8000), 0xEA);
        assert_eq!(mapper.read_cpu(0xC000), 0xEA);
    }
}
