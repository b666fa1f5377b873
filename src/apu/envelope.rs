/// Length counter load table, indexed by bits 7-3 of the length register
const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// Volume envelope shared by the pulse and noise channels.
///
/// Register layout (`--LC VVVV`): L loops the decay (and halts the length
/// counter), C selects constant volume, V is the volume or decay period.
#[derive(Debug, Default)]
pub struct Envelope {
    start: bool,
    looping: bool,
    constant_volume: bool,
    period: u8,
    divider: u8,
    decay: u8,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, value: u8) {
        self.looping = value & 0x20 != 0;
        self.constant_volume = value & 0x10 != 0;
        self.period = value & 0x0F;
    }

    /// Restart the decay on the next quarter frame
    pub fn restart(&mut self) {
        self.start = true;
    }

    /// Quarter-frame clock
    pub fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.period;
        } else if self.divider == 0 {
            self.divider = self.period;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.looping {
                self.decay = 15;
            }
        } else {
            self.divider -= 1;
        }
    }

    /// Current volume 0-15
    pub fn volume(&self) -> u8 {
        if self.constant_volume { self.period } else { self.decay }
    }

    pub fn start_pending(&self) -> bool {
        self.start
    }
}

/// Length counter gated by the channel's $4015 enable bit
#[derive(Debug, Default)]
pub struct LengthCounter {
    value: u8,
    halted: bool,
    enabled: bool,
}

impl LengthCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disabling a channel clears its counter immediately
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.value = 0;
        }
    }

    pub fn set_halted(&mut self, halted: bool) {
        self.halted = halted;
    }

    /// Load from a length register write (`value` is the full register byte)
    pub fn load(&mut self, value: u8) {
        if self.enabled {
            self.value = LENGTH_TABLE[(value >> 3) as usize];
        }
    }

    /// Half-frame clock
    pub fn clock(&mut self) {
        if !self.halted && self.value > 0 {
            self.value -= 1;
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.value > 0
    }
}
