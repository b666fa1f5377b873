use super::Channel;
use super::envelope::LengthCounter;

/// 32-step triangle: 15 down to 0, then 0 up to 15
const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0,
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

/// Triangle channel ($4008-$400B). The timer runs at the full CPU rate and the
/// linear counter takes the place of an envelope.
#[derive(Debug, Default)]
pub struct Triangle {
    timer_period: u16,
    timer: u16,
    step: u8,
    linear_counter: u8,
    linear_reload_value: u8,
    linear_reload: bool,
    /// Halts the length counter and keeps the linear reload flag set
    control: bool,
    length: LengthCounter,
}

impl Triangle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_register(&mut self, register: u16, value: u8) {
        match register & 0x03 {
            0 => {
                self.control = value & 0x80 != 0;
                self.linear_reload_value = value & 0x7F;
                self.length.set_halted(self.control);
            }
            1 => {}
            2 => self.timer_period = (self.timer_period & 0x0700) | u16::from(value),
            _ => {
                self.timer_period = (self.timer_period & 0x00FF) | (u16::from(value & 0x07) << 8);
                self.length.load(value);
                self.linear_reload = true;
            }
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    pub fn length_counter(&self) -> u8 {
        self.length.value()
    }

    pub fn linear_counter(&self) -> u8 {
        self.linear_counter
    }
}

impl Channel for Triangle {
    fn output(&self) -> u8 {
        TRIANGLE_SEQUENCE[self.step as usize]
    }

    fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            // Both counters gate the sequencer; the output holds its level
            if self.linear_counter > 0 && self.length.is_active() {
                self.step = (self.step + 1) & 0x1F;
            }
        } else {
            self.timer -= 1;
        }
    }

    /// Quarter frame clocks the linear counter
    fn clock_envelope(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_reload_value;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.control {
            self.linear_reload = false;
        }
    }

    fn clock_length_counter(&mut self) {
        self.length.clock();
    }
}
