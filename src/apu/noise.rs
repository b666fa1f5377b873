use super::Channel;
use super::envelope::{Envelope, LengthCounter};
use crate::nes::TvSystem;

/// Timer periods in CPU cycles
const NTSC_PERIODS: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];
const PAL_PERIODS: [u16; 16] = [
    4, 8, 14, 30, 60, 88, 118, 148, 188, 236, 354, 472, 708, 944, 1890, 3778,
];

/// Pseudo-random noise channel ($400C-$400F) driven by a 15-bit LFSR
#[derive(Debug)]
pub struct Noise {
    periods: &'static [u16; 16],
    /// Power-up value is 1
    shift_register: u16,
    /// Short mode taps bit 6 instead of bit 1
    short_mode: bool,
    timer_period: u16,
    timer: u16,
    envelope: Envelope,
    length: LengthCounter,
}

impl Noise {
    pub fn new(tv_system: TvSystem) -> Self {
        let periods = match tv_system {
            TvSystem::Ntsc => &NTSC_PERIODS,
            TvSystem::Pal => &PAL_PERIODS,
        };
        Self {
            periods,
            shift_register: 1,
            short_mode: false,
            timer_period: periods[0],
            timer: 0,
            envelope: Envelope::new(),
            length: LengthCounter::new(),
        }
    }

    pub fn write_register(&mut self, register: u16, value: u8) {
        match register & 0x03 {
            0 => {
                self.envelope.write(value);
                self.length.set_halted(value & 0x20 != 0);
            }
            1 => {}
            2 => {
                self.short_mode = value & 0x80 != 0;
                self.timer_period = self.periods[(value & 0x0F) as usize];
            }
            _ => {
                self.length.load(value);
                self.envelope.restart();
            }
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    pub fn length_counter(&self) -> u8 {
        self.length.value()
    }

    fn clock_shift_register(&mut self) {
        let tap = if self.short_mode { 6 } else { 1 };
        let feedback = (self.shift_register ^ (self.shift_register >> tap)) & 1;
        self.shift_register = (self.shift_register >> 1) | (feedback << 14);
    }
}

impl Channel for Noise {
    fn output(&self) -> u8 {
        if !self.length.is_active() || self.shift_register & 1 != 0 {
            return 0;
        }
        self.envelope.volume()
    }

    fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period - 1;
            self.clock_shift_register();
        } else {
            self.timer -= 1;
        }
    }

    fn clock_envelope(&mut self) {
        self.envelope.clock();
    }

    fn clock_length_counter(&mut self) {
        self.length.clock();
    }
}
