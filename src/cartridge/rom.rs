use tracing::info;

use crate::cartridge::Mirroring;
use crate::error::RomError;

pub const HEADER_SIZE: usize = 16;
pub const PRG_CHUNK_SIZE: usize = 16 * 1024;
pub const CHR_CHUNK_SIZE: usize = 8 * 1024;

const MAGIC: &[u8; 4] = b"NES\x1A";

// Flags 6
const FLAG6_VERTICAL: u8 = 0b0000_0001;
const FLAG6_PRG_RAM: u8 = 0b0000_0010;
const FLAG6_TRAINER: u8 = 0b0000_0100;
const FLAG6_FOUR_SCREEN: u8 = 0b0000_1000;

// Flags 7
const FLAG7_CONSOLE_TYPE: u8 = 0b0000_0011;
const FLAG7_FORMAT: u8 = 0b0000_1100;
const FORMAT_NES2: u8 = 0b0000_1000;

/// A parsed iNES image: header metadata plus the PRG and CHR payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomImage {
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    mirroring: Mirroring,
    has_prg_ram: bool,
    alternative_nametables: bool,
    mapper_number: u8,
}

impl RomImage {
    /// Parse an iNES (v1) image.
    ///
    /// Layout: 16 byte header, PRG payload (16KB chunks), CHR payload (8KB
    /// chunks). A CHR count of zero means the board carries CHR-RAM.
    pub fn parse(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < HEADER_SIZE {
            return Err(RomError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if &data[0..4] != MAGIC {
            return Err(RomError::InvalidMagic);
        }

        let prg_size = data[4] as usize * PRG_CHUNK_SIZE;
        let chr_size = data[5] as usize * CHR_CHUNK_SIZE;
        let flags6 = data[6];
        let flags7 = data[7];

        if flags6 & FLAG6_TRAINER != 0 {
            return Err(RomError::TrainerUnsupported);
        }
        if flags7 & FLAG7_FORMAT == FORMAT_NES2 {
            return Err(RomError::Nes2Unsupported);
        }
        if flags7 & FLAG7_CONSOLE_TYPE != 0 {
            return Err(RomError::UnsupportedConsole(flags7 & FLAG7_CONSOLE_TYPE));
        }

        let alternative_nametables = flags6 & FLAG6_FOUR_SCREEN != 0;
        let mirroring = if alternative_nametables {
            Mirroring::FourScreen
        } else if flags6 & FLAG6_VERTICAL != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let prg_end = HEADER_SIZE + prg_size;
        let chr_end = prg_end + chr_size;
        if data.len() < chr_end {
            return Err(RomError::Truncated {
                expected: chr_end,
                actual: data.len(),
            });
        }

        let image = Self {
            prg_rom: data[HEADER_SIZE..prg_end].to_vec(),
            chr_rom: data[prg_end..chr_end].to_vec(),
            mirroring,
            has_prg_ram: flags6 & FLAG6_PRG_RAM != 0,
            alternative_nametables,
            mapper_number: (flags6 >> 4) | (flags7 & 0xF0),
        };

        info!(
            mapper = image.mapper_number,
            prg_kb = prg_size / 1024,
            chr_kb = chr_size / 1024,
            mirroring = ?image.mirroring,
            prg_ram = image.has_prg_ram,
            "parsed iNES header"
        );

        Ok(image)
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    /// True when the board uses CHR-RAM instead of CHR-ROM
    pub fn has_chr_ram(&self) -> bool {
        self.chr_rom.is_empty()
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub fn has_prg_ram(&self) -> bool {
        self.has_prg_ram
    }

    pub fn alternative_nametables(&self) -> bool {
        self.alternative_nametables
    }

    pub fn mapper_number(&self) -> u8 {
        self.mapper_number
    }

    /// Hand the payloads over to a mapper
    pub fn into_payload(self) -> (Vec<u8>, Vec<u8>) {
        (self.prg_rom, self.chr_rom)
    }
}
