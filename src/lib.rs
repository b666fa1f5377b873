pub mod apu;
pub mod cartridge;
pub mod clock;
pub mod config;
pub mod cpu;
pub mod error;
pub mod joypad;
pub mod memory;
pub mod nes;
pub mod ppu;

#[cfg(feature = "frontend")]
pub mod audio;
#[cfg(feature = "frontend")]
pub mod eventloop;

#[cfg(test)]
mod nestest;
