use super::Channel;
use super::envelope::{Envelope, LengthCounter};

/// Periods below this are ultrasonic and silenced
const MIN_PERIOD: u16 = 8;
const MAX_TARGET_PERIOD: u16 = 0x7FF;

/// Duty waveforms. The sequencer counts down from 0, so it reads
/// 0, 7, 6, 5, 4, 3, 2, 1.
const DUTY_SEQUENCES: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1], // 12.5%
    [0, 0, 0, 0, 0, 0, 1, 1], // 25%
    [0, 0, 0, 0, 1, 1, 1, 1], // 50%
    [1, 1, 1, 1, 1, 1, 0, 0], // 25% negated
];

/// Which of the two pulse units this is. They differ only in how the sweep
/// unit negates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseUnit {
    /// Ones' complement negate
    One,
    /// Two's complement negate
    Two,
}

#[derive(Debug, Default)]
struct Sweep {
    enabled: bool,
    period: u8,
    negate: bool,
    shift: u8,
    reload: bool,
    divider: u8,
}

/// Square wave channel ($4000-$4003 / $4004-$4007)
#[derive(Debug)]
pub struct Pulse {
    unit: PulseUnit,
    timer_period: u16,
    timer: u16,
    /// The timer runs at half the CPU rate
    skip_tick: bool,
    duty: u8,
    step: u8,
    envelope: Envelope,
    length: LengthCounter,
    sweep: Sweep,
}

impl Pulse {
    pub fn new(unit: PulseUnit) -> Self {
        Self {
            unit,
            timer_period: 0,
            timer: 0,
            skip_tick: false,
            duty: 0,
            step: 0,
            envelope: Envelope::new(),
            length: LengthCounter::new(),
            sweep: Sweep::default(),
        }
    }

    /// `register` is the offset within the channel's four registers
    pub fn write_register(&mut self, register: u16, value: u8) {
        match register & 0x03 {
            0 => {
                self.duty = value >> 6;
                self.envelope.write(value);
                self.length.set_halted(value & 0x20 != 0);
            }
            1 => {
                self.sweep.enabled = value & 0x80 != 0;
                self.sweep.period = (value >> 4) & 0x07;
                self.sweep.negate = value & 0x08 != 0;
                self.sweep.shift = value & 0x07;
                self.sweep.reload = true;
            }
            2 => self.timer_period = (self.timer_period & 0x0700) | u16::from(value),
            _ => {
                self.timer_period = (self.timer_period & 0x00FF) | (u16::from(value & 0x07) << 8);
                self.length.load(value);
                self.envelope.restart();
                self.step = 0;
            }
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.length.set_enabled(enabled);
    }

    pub fn length_counter(&self) -> u8 {
        self.length.value()
    }

    pub fn timer_period(&self) -> u16 {
        self.timer_period
    }

    fn target_period(&self) -> u16 {
        let change = self.timer_period >> self.sweep.shift;
        if !self.sweep.negate {
            return self.timer_period + change;
        }
        match self.unit {
            PulseUnit::One => self.timer_period.saturating_sub(change + 1),
            PulseUnit::Two => self.timer_period.saturating_sub(change),
        }
    }

    /// The sweep mutes the channel even while disabled
    fn muted(&self) -> bool {
        self.timer_period < MIN_PERIOD || self.target_period() > MAX_TARGET_PERIOD
    }

    /// Half-frame clock of the sweep unit
    pub fn clock_sweep(&mut self) {
        if self.sweep.divider == 0 && self.sweep.enabled && self.sweep.shift != 0 && !self.muted()
        {
            self.timer_period = self.target_period();
        }
        if self.sweep.divider == 0 || self.sweep.reload {
            self.sweep.divider = self.sweep.period;
            self.sweep.reload = false;
        } else {
            self.sweep.divider -= 1;
        }
    }
}

impl Channel for Pulse {
    fn output(&self) -> u8 {
        if !self.length.is_active() || self.muted() {
            return 0;
        }
        DUTY_SEQUENCES[self.duty as usize][self.step as usize] * self.envelope.volume()
    }

    fn clock_timer(&mut self) {
        self.skip_tick = !self.skip_tick;
        if self.skip_tick {
            return;
        }
        if self.timer == 0 {
            self.timer = self.timer_period;
            self.step = self.step.wrapping_sub(1) & 0x07;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_pulse(unit: PulseUnit) -> Pulse {
        let mut pulse = Pulse::new(unit);
        pulse.set_enabled(true);
        pulse
    }

    #[test]
    fn test_timer_registers() {
        let mut pulse = Pulse::new(PulseUnit::One);
        pulse.write_register(2, 0xCD);
        pulse.write_register(3, 0xFF);
        assert_eq!(pulse.timer_period(), 0x07CD);
    }

    #[test]
    fn test_timer_ticks_every_second_call() {
        let mut pulse = Pulse::new(PulseUnit::One);
        pulse.write_register(2, 0x00);
        // Period 0: every tick underflows and steps the sequencer
        pulse.clock_timer();
        assert_eq!(pulse.step, 0);
        pulse.clock_timer();
        assert_eq!(pulse.step, 7);
        pulse.clock_timer();
        assert_eq!(pulse.step, 7);
        pulse.clock_timer();
        assert_eq!(pulse.step, 6);
    }

    #[test]
    fn test_underflow_reloads_period() {
        let mut pulse = Pulse::new(PulseUnit::One);
        pulse.write_register(2, 0x02);
        // First tick underflows from 0, then the period counts 2, 1, 0
        for _ in 0..2 {
            pulse.clock_timer();
        }
        assert_eq!(pulse.step, 7);
        for _ in 0..4 {
            pulse.clock_timer();
        }
        assert_eq!(pulse.step, 7);
        for _ in 0..2 {
            pulse.clock_timer();
        }
        assert_eq!(pulse.step, 6);
    }

    #[test]
    fn test_duty_waveform_output() {
        let mut pulse = enabled_pulse(PulseUnit::One);
        // 50% duty, constant volume 9, period 8
        pulse.write_register(0, 0b1011_1001);
        pulse.write_register(2, 0x08);
        pulse.write_register(3, 0x08);

        let mut high = 0;
        for step in [0u8, 7, 6, 5, 4, 3, 2, 1] {
            pulse.step = step;
            if pulse.output() == 9 {
                high += 1;
            }
        }
        assert_eq!(high, 4);
    }

    #[test]
    fn test_silent_below_minimum_period() {
        let mut pulse = enabled_pulse(PulseUnit::One);
        pulse.write_register(0, 0b1011_1111);
        pulse.write_register(2, 0x07);
        pulse.write_register(3, 0x08);
        for step in 0..8 {
            pulse.step = step;
            assert_eq!(pulse.output(), 0);
        }
    }

    #[test]
    fn test_silent_when_length_expired() {
        let mut pulse = Pulse::new(PulseUnit::One);
        pulse.write_register(0, 0b1011_1111);
        pulse.write_register(2, 0x40);
        // Channel disabled, so the length load is ignored
        pulse.write_register(3, 0x08);
        pulse.step = 7;
        assert_eq!(pulse.output(), 0);
    }

    #[test]
    fn test_length_register_resets_sequencer_and_envelope() {
        let mut pulse = enabled_pulse(PulseUnit::One);
        pulse.step = 5;
        pulse.write_register(3, 0x10);
        assert_eq!(pulse.step, 0);
        assert!(pulse.envelope.start_pending());
        assert_eq!(pulse.length_counter(), 20);
    }

    #[test]
    fn test_sweep_negate_differs_between_units() {
        let mut one = Pulse::new(PulseUnit::One);
        let mut two = Pulse::new(PulseUnit::Two);
        for pulse in [&mut one, &mut two] {
            pulse.write_register(2, 0x00);
            pulse.write_register(3, 0x01); // period $100
            pulse.write_register(1, 0b1000_1001); // enabled, negate, shift 1
        }
        assert_eq!(one.target_period(), 0x100 - 0x80 - 1);
        assert_eq!(two.target_period(), 0x100 - 0x80);
    }

    #[test]
    fn test_sweep_updates_period_on_half_frame() {
        let mut pulse = Pulse::new(PulseUnit::Two);
        pulse.write_register(2, 0x00);
        pulse.write_register(3, 0x01);
        pulse.write_register(1, 0b1000_0001); // enabled, period 0, shift 1
        pulse.clock_sweep();
        assert_eq!(pulse.timer_period(), 0x180);
        assert!(!pulse.sweep.reload);
    }

    #[test]
    fn test_sweep_target_overflow_mutes() {
        let mut pulse = enabled_pulse(PulseUnit::One);
        pulse.write_register(0, 0b1011_1111);
        pulse.write_register(2, 0x00);
        pulse.write_register(3, 0x0E); // period $600, length loaded
        pulse.write_register(1, 0x01); // disabled, shift 1: target $900
        pulse.step = 7;
        assert_eq!(pulse.output(), 0);
        pulse.clock_sweep();
        assert_eq!(pulse.timer_period(), 0x600);
    }
}
