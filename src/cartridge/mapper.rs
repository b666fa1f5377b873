use std::cell::RefCell;
use std::rc::Rc;

use crate::cartridge::{
    AxromMapper, CnromMapper, EmptyMapper, Mmc1Mapper, NromMapper, RomImage, UxromMapper,
};
use crate::error::RomError;

pub(crate) const PRG_RAM_SIZE: usize = 0x2000; // 8KB
pub(crate) const CHR_RAM_SIZE: usize = 0x2000; // 8KB
pub(crate) const PRG_BANK_SIZE: usize = 0x4000; // 16KB
pub(crate) const CHR_BANK_SIZE: usize = 0x2000; // 8KB

const NAMETABLE_SIZE: usize = 0x0400;

/// Handle to the inserted cartridge, shared by the CPU bus and the PPU bus.
///
/// Swapping a cartridge replaces the boxed mapper in place, so every holder of
/// the handle sees the new one.
pub type SharedMapper = Rc<RefCell<Box<dyn Mapper>>>;

/// Nametable mirroring arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    /// $2000=$2400, $2800=$2C00 (vertical scrolling games)
    Horizontal,
    /// $2000=$2800, $2400=$2C00 (horizontal scrolling games)
    Vertical,
    SingleScreenLower,
    SingleScreenUpper,
    /// Cartridge supplies the extra 2KB, every table is distinct
    FourScreen,
}

/// Descriptive metadata about a mapper variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

/// Trait for NES cartridge mappers
///
/// A mapper sits on both buses. On the CPU side it answers $4020-$FFFF
/// (expansion area, PRG-RAM, PRG-ROM and bank registers). On the PPU side it
/// answers $0000-$3EFF: pattern tables plus the nametables, which live in
/// VRAM owned by the mapper so the cartridge can wire its own mirroring.
pub trait Mapper {
    /// Read a byte from CPU address space ($4020-$FFFF)
    fn read_cpu(&self, addr: u16) -> u8;

    /// Write a byte to CPU address space ($4020-$FFFF)
    fn write_cpu(&mut self, addr: u16, value: u8);

    /// Read a byte from PPU address space ($0000-$3EFF)
    fn read_ppu(&self, addr: u16) -> u8;

    /// Write a byte to PPU address space ($0000-$3EFF)
    fn write_ppu(&mut self, addr: u16, value: u8);

    /// Current nametable arrangement
    fn mirroring(&self) -> Mirroring;

    fn info(&self) -> MapperInfo;
}

/// Build the mapper variant named by an iNES mapper number.
pub fn create_mapper(image: RomImage) -> Result<Box<dyn Mapper>, RomError> {
    let mirroring = image.mirroring();
    let has_prg_ram = image.has_prg_ram();
    let number = image.mapper_number();
    let (prg_rom, chr_rom) = image.into_payload();

    let mapper: Box<dyn Mapper> = match number {
        0 => Box::new(NromMapper::new(prg_rom, chr_rom, mirroring, has_prg_ram)),
        1 => Box::new(Mmc1Mapper::new(prg_rom, chr_rom)),
        2 => Box::new(UxromMapper::new(prg_rom, chr_rom, mirroring)),
        3 => Box::new(CnromMapper::new(prg_rom, chr_rom, mirroring)),
        7 => Box::new(AxromMapper::new(prg_rom, chr_rom)),
        _ => return Err(RomError::UnsupportedMapper(number)),
    };
    Ok(mapper)
}

/// A handle holding the empty cartridge slot.
pub fn empty_slot() -> SharedMapper {
    Rc::new(RefCell::new(Box::new(EmptyMapper)))
}

/// Open bus: nothing drives the data lines, the last value on them was the
/// high byte of the address.
pub(crate) fn open_bus(addr: u16) -> u8 {
    (addr >> 8) as u8
}

/// Pattern table storage: CHR-ROM from the image, or 8KB of CHR-RAM when the
/// image ships none. Indexes wrap so undersized ROMs mirror.
pub(crate) struct ChrMemory {
    data: Vec<u8>,
    is_ram: bool,
}

impl ChrMemory {
    pub(crate) fn new(chr_rom: Vec<u8>) -> Self {
        if chr_rom.is_empty() {
            Self {
                data: vec![0; CHR_RAM_SIZE],
                is_ram: true,
            }
        } else {
            Self {
                data: chr_rom,
                is_ram: false,
            }
        }
    }

    pub(crate) fn is_ram(&self) -> bool {
        self.is_ram
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn read(&self, index: usize) -> u8 {
        self.data[index % self.data.len()]
    }

    /// CHR-ROM ignores writes
    pub(crate) fn write(&mut self, index: usize, value: u8) {
        if self.is_ram {
            let len = self.data.len();
            self.data[index % len] = value;
        }
    }
}

/// Console VRAM as seen through the cartridge's nametable wiring.
///
/// Sized for four screens so that four-screen boards need no extra type; the
/// other arrangements only touch the first 2KB.
pub struct Nametables {
    vram: Box<[u8; 4 * NAMETABLE_SIZE]>,
    mirroring: Mirroring,
}

impl Nametables {
    pub fn new(mirroring: Mirroring) -> Self {
        Self {
            vram: Box::new([0; 4 * NAMETABLE_SIZE]),
            mirroring,
        }
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.mirroring = mirroring;
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.vram[self.index(addr)]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        let index = self.index(addr);
        self.vram[index] = value;
    }

    /// Map $2000-$3EFF onto physical VRAM ($3000-$3EFF mirrors $2000-$2EFF)
    fn index(&self, addr: u16) -> usize {
        let offset = (addr & 0x0FFF) as usize;
        let table = offset / NAMETABLE_SIZE;
        let physical = match self.mirroring {
            Mirroring::Horizontal => table / 2,
            Mirroring::Vertical => table % 2,
            Mirroring::SingleScreenLower => 0,
            Mirroring::SingleScreenUpper => 1,
            Mirroring::FourScreen => table,
        };
        physical * NAMETABLE_SIZE + offset % NAMETABLE_SIZE
    }
}
