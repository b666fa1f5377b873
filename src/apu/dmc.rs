use super::Channel;

/// Delta modulation channel ($4010-$4013).
///
/// Only the 7-bit output level is emulated: $4011 writes set it directly.
/// Sample playback from CPU memory is not implemented, so the sample address
/// and length registers are latched but never consumed.
#[derive(Debug, Default)]
pub struct Dmc {
    irq_enabled: bool,
    looping: bool,
    rate_index: u8,
    output_level: u8,
    sample_address: u16,
    sample_length: u16,
}

impl Dmc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_register(&mut self, register: u16, value: u8) {
        match register & 0x03 {
            0 => {
                self.irq_enabled = value & 0x80 != 0;
                self.looping = value & 0x40 != 0;
                self.rate_index = value & 0x0F;
            }
            1 => self.output_level = value & 0x7F,
            // $C000 + A * 64
            2 => self.sample_address = 0xC000 | (u16::from(value) << 6),
            // L * 16 + 1 bytes
            _ => self.sample_length = (u16::from(value) << 4) + 1,
        }
    }

    /// Last $4010 value as latched
    pub fn flags(&self) -> u8 {
        (u8::from(self.irq_enabled) << 7) | (u8::from(self.looping) << 6) | self.rate_index
    }

    pub fn sample_address(&self) -> u16 {
        self.sample_address
    }

    pub fn sample_length(&self) -> u16 {
        self.sample_length
    }
}

impl Channel for Dmc {
    fn output(&self) -> u8 {
        self.output_level
    }

    fn clock_timer(&mut self) {}

    fn clock_envelope(&mut self) {}

    fn clock_length_counter(&mut self) {}
}
