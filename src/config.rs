use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use crate::apu::DEFAULT_SAMPLE_RATE;
use crate::nes::TvSystem;

/// NES emulator
#[derive(Parser, Debug, Clone)]
#[command(name = "neser")]
#[command(about = "A cycle-stepped NES emulator", long_about = None)]
pub struct Config {
    /// Path to the iNES ROM file. Without one the console boots an empty slot.
    pub rom: Option<PathBuf>,

    /// Emulate a PAL console instead of NTSC
    #[arg(long)]
    pub pal: bool,

    /// Window scaling factor (1.0 - 5.0)
    #[arg(short, long, default_value_t = 2.0)]
    pub scale: f32,

    /// Emulation speed relative to real time (0.001 - 100.0)
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Frames to run before exiting in headless mode
    #[arg(short, long, default_value_t = 60)]
    pub frames: u64,

    /// Run without a window or audio device
    #[arg(long)]
    pub headless: bool,

    /// Audio output rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,
}

impl Config {
    const MIN_SCALE: f32 = 1.0;
    const MAX_SCALE: f32 = 5.0;
    pub const MIN_SPEED: f64 = 0.001;
    pub const MAX_SPEED: f64 = 100.0;

    /// Parse the process arguments and clamp out-of-range values
    pub fn from_args() -> Self {
        Self::parse().clamped()
    }

    /// Pull scale and speed back into their supported ranges, warning on each
    /// adjustment
    pub fn clamped(mut self) -> Self {
        self.scale =
            clamp_with_warning("video scale", self.scale, Self::MIN_SCALE, Self::MAX_SCALE);
        self.speed = clamp_with_warning("speed", self.speed, Self::MIN_SPEED, Self::MAX_SPEED);
        self
    }

    pub fn tv_system(&self) -> TvSystem {
        if self.pal { TvSystem::Pal } else { TvSystem::Ntsc }
    }
}

pub(crate) fn clamp_with_warning<T>(name: &str, value: T, min: T, max: T) -> T
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if value < min {
        warn!("{} {} is below minimum {}, clamping", name, value, min);
        min
    } else if value > max {
        warn!("{} {} is above maximum {}, clamping", name, value, max);
        max
    } else {
        value
    }
}
