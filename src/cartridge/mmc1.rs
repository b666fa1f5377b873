use tracing::debug;

use crate::cartridge::mapper::{ChrMemory, PRG_BANK_SIZE, PRG_RAM_SIZE, open_bus};
use crate::cartridge::{Mapper, MapperInfo, Mirroring, Nametables};

const CHR_BANK_SIZE_4K: usize = 0x1000;
const SHIFT_REGISTER_RESET: u8 = 0x80; // Bit 7 set triggers reset
const WRITE_COUNT_MAX: u8 = 5; // Number of writes to load a register
const DEFAULT_CONTROL: u8 = 0x0C; // PRG mode 3, CHR mode 0

// Control register fields
const CONTROL_MIRRORING: u8 = 0b0_0011;
const CONTROL_PRG_MODE: u8 = 0b0_1100;
const CONTROL_CHR_4K: u8 = 0b1_0000;

const PRG_RAM_DISABLE: u8 = 0b1_0000;

/// Register targeted by a completed serial write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mmc1Register {
    Control,
    ChrBank0,
    ChrBank1,
    PrgBank,
}

impl Mmc1Register {
    /// Address bits 13-14 pick the register
    fn from_address(addr: u16) -> Self {
        match (addr >> 13) & 0x03 {
            0 => Mmc1Register::Control,
            1 => Mmc1Register::ChrBank0,
            2 => Mmc1Register::ChrBank1,
            _ => Mmc1Register::PrgBank,
        }
    }
}

/// MMC1 mapper (Mapper 1)
///
/// Registers are loaded through a 5-bit serial port: each write to
/// $8000-$FFFF shifts bit 0 in (LSB first), and the fifth write copies the
/// assembled value into the register chosen by that write's address. A write
/// with bit 7 set aborts the sequence and forces PRG mode 3.
///
/// - $8000-$9FFF: Control (mirroring, PRG mode, CHR mode)
/// - $A000-$BFFF: CHR bank 0
/// - $C000-$DFFF: CHR bank 1
/// - $E000-$FFFF: PRG bank (bit 4 disables PRG-RAM)
pub struct Mmc1Mapper {
    prg_rom: Vec<u8>,
    prg_ram: Vec<u8>,
    chr: ChrMemory,
    nametables: Nametables,

    shift_register: u8,
    write_count: u8,

    control: u8,
    chr_bank_0: u8,
    chr_bank_1: u8,
    prg_bank: u8,
}

impl Mmc1Mapper {
    pub fn new(prg_rom: Vec<u8>, chr_rom: Vec<u8>) -> Self {
        let mut mapper = Self {
            prg_rom,
            prg_ram: vec![0; PRG_RAM_SIZE],
            chr: ChrMemory::new(chr_rom),
            nametables: Nametables::new(Mirroring::SingleScreenLower),
            shift_register: 0,
            write_count: 0,
            control: DEFAULT_CONTROL,
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
        };
        mapper.apply_mirroring();
        mapper
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn register(&self, register: Mmc1Register) -> u8 {
        match register {
            Mmc1Register::Control => self.control,
            Mmc1Register::ChrBank0 => self.chr_bank_0,
            Mmc1Register::ChrBank1 => self.chr_bank_1,
            Mmc1Register::PrgBank => self.prg_bank,
        }
    }

    fn write_serial(&mut self, addr: u16, value: u8) {
        if value & SHIFT_REGISTER_RESET != 0 {
            self.shift_register = 0;
            self.write_count = 0;
            self.control |= DEFAULT_CONTROL;
            return;
        }

        self.shift_register >>= 1;
        self.shift_register |= (value & 0x01) << 4;
        self.write_count += 1;

        if self.write_count == WRITE_COUNT_MAX {
            let register = Mmc1Register::from_address(addr);
            let value = self.shift_register & 0x1F;
            debug!(?register, value, "MMC1 register commit");
            match register {
                Mmc1Register::Control => {
                    self.control = value;
                    self.apply_mirroring();
                }
                Mmc1Register::ChrBank0 => self.chr_bank_0 = value,
                Mmc1Register::ChrBank1 => self.chr_bank_1 = value,
                Mmc1Register::PrgBank => self.prg_bank = value,
            }
            self.shift_register = 0;
            self.write_count = 0;
        }
    }

    fn apply_mirroring(&mut self) {
        let mirroring = match self.control & CONTROL_MIRRORING {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        };
        self.nametables.set_mirroring(mirroring);
    }

    fn prg_ram_enabled(&self) -> bool {
        self.prg_bank & PRG_RAM_DISABLE == 0
    }

    /// Offset into PRG-ROM for a CPU address in $8000-$FFFF
    fn prg_offset(&self, addr: u16) -> usize {
        let bank_count = (self.prg_rom.len() / PRG_BANK_SIZE).max(1);
        let select = (self.prg_bank & 0x0F) as usize;
        let in_bank = addr as usize & (PRG_BANK_SIZE - 1);

        let bank = match (self.control & CONTROL_PRG_MODE) >> 2 {
            // 32KB: low bit of the bank number ignored
            0 | 1 => (select & !1) + usize::from(addr >= 0xC000),
            // First bank fixed at $8000
            2 => {
                if addr < 0xC000 {
                    0
                } else {
                    select
                }
            }
            // Last bank fixed at $C000
            _ => {
                if addr < 0xC000 {
                    select
                } else {
                    bank_count - 1
                }
            }
        };
        (bank % bank_count) * PRG_BANK_SIZE + in_bank
    }

    /// Offset into CHR memory for a PPU address in $0000-$1FFF
    fn chr_offset(&self, addr: u16) -> usize {
        let bank = if self.control & CONTROL_CHR_4K != 0 {
            if addr < 0x1000 {
                self.chr_bank_0
            } else {
                self.chr_bank_1
            }
        } else {
            // 8KB: low bit ignored, the pair covers both halves
            (self.chr_bank_0 & 0x1E) | u8::from(addr >= 0x1000)
        };
        let bank = bank as usize;
        let bank_count = (self.chr.len() / CHR_BANK_SIZE_4K).max(1);
        (bank % bank_count) * CHR_BANK_SIZE_4K + (addr as usize & (CHR_BANK_SIZE_4K - 1))
    }
}

impl Mapper for Mmc1Mapper {
    fn read_cpu(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF if self.prg_ram_enabled() => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF if !self.prg_rom.is_empty() => self.prg_rom[self.prg_offset(addr)],
            _ => open_bus(addr),
        }
    }

    fn write_cpu(&mut self, addr: u16, value: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled() {
                    self.prg_ram[(addr - 0x6000) as usize] = value;
                }
            }
            0x8000..=0xFFFF => self.write_serial(addr, value),
            _ => {}
        }
    }

    fn read_ppu(&self, addr: u16) -> u8 {
        match addr & 0x3FFF {
            0x0000..=0x1FFF => self.chr.read(self.chr_offset(addr)),
            _ => self.nametables.read(addr),
        }
    }

    fn write_ppu(&mut self, addr: u16, value: u8) {
        match addr & 0x3FFF {
            0x0000..=0x1FFF => {
                let offset = self.chr_offset(addr);
                self.chr.write(offset, value);
            }
            _ => self.nametables.write(addr, value),
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.nametables.mirroring()
    }

    fn info(&self) -> MapperInfo {
        MapperInfo {
            name: "MMC1",
            aliases: &["mapper 1", "SxROM", "MMC1B"],
            description: "Serial-loaded PRG/CHR bank switching with programmable mirroring",
        }
    }
}
