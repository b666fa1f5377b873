use tracing::debug;

use super::Channel;
use super::dmc::Dmc;
use super::frame_counter::{FrameClock, FrameCounter};
use super::mixer::{ChannelLevels, mix};
use super::noise::Noise;
use super::pulse::{Pulse, PulseUnit};
use super::samples::SampleBuffer;
use super::triangle::Triangle;
use crate::cpu::InterruptLines;
use crate::error::AudioError;
use crate::nes::TvSystem;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

// Status register ($4015) bit masks
const STATUS_PULSE1: u8 = 1 << 0;
const STATUS_PULSE2: u8 = 1 << 1;
const STATUS_TRIANGLE: u8 = 1 << 2;
const STATUS_NOISE: u8 = 1 << 3;
const STATUS_FRAME_IRQ: u8 = 1 << 6;

/// NES Audio Processing Unit, clocked once per CPU cycle
pub struct Apu {
    tv_system: TvSystem,
    frame_counter: FrameCounter,
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    interrupts: InterruptLines,
    sample_rate: u32,
    /// Counts up by the sample rate each cycle; a sample is due every time it
    /// passes the CPU frequency
    sample_phase: u32,
    samples: SampleBuffer,
}

impl Apu {
    pub fn new(tv_system: TvSystem, interrupts: InterruptLines) -> Self {
        Self {
            tv_system,
            frame_counter: FrameCounter::new(tv_system),
            pulse1: Pulse::new(PulseUnit::One),
            pulse2: Pulse::new(PulseUnit::Two),
            triangle: Triangle::new(),
            noise: Noise::new(tv_system),
            dmc: Dmc::new(),
            interrupts,
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_phase: 0,
            samples: SampleBuffer::default(),
        }
    }

    /// Silence every channel and restart the frame sequencer
    pub fn reset(&mut self) {
        self.frame_counter.reset();
        self.pulse1 = Pulse::new(PulseUnit::One);
        self.pulse2 = Pulse::new(PulseUnit::Two);
        self.triangle = Triangle::new();
        self.noise = Noise::new(self.tv_system);
        self.dmc = Dmc::new();
        self.sample_phase = 0;
        self.samples.clear();
        debug!("APU reset");
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.sample_phase = 0;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels_mut(&mut self) -> [&mut dyn Channel; 5] {
        [
            &mut self.pulse1,
            &mut self.pulse2,
            &mut self.triangle,
            &mut self.noise,
            &mut self.dmc,
        ]
    }

    /// Advance one CPU cycle
    pub fn clock(&mut self) {
        let frame = self.frame_counter.clock();
        self.apply_frame_clock(frame);
        if self.frame_counter.irq_flag() {
            self.interrupts.request_irq();
        }

        for channel in self.channels_mut() {
            channel.clock_timer();
        }

        self.sample_phase += self.sample_rate;
        let cpu_frequency = self.tv_system.cpu_frequency();
        if self.sample_phase >= cpu_frequency {
            self.sample_phase -= cpu_frequency;
            let sample = self.output();
            self.samples.push(sample);
        }
    }

    fn apply_frame_clock(&mut self, frame: FrameClock) {
        if frame.quarter {
            for channel in self.channels_mut() {
                channel.clock_envelope();
            }
        }
        if frame.half {
            for channel in self.channels_mut() {
                channel.clock_length_counter();
            }
            self.pulse1.clock_sweep();
            self.pulse2.clock_sweep();
        }
    }

    /// Current mixed output level, 0.0..=1.0
    pub fn output(&self) -> f32 {
        mix(ChannelLevels {
            pulse1: self.pulse1.output(),
            pulse2: self.pulse2.output(),
            triangle: self.triangle.output(),
            noise: self.noise.output(),
            dmc: self.dmc.output(),
        })
    }

    /// CPU write to $4000-$4013, $4015 or $4017
    pub fn write_register(&mut self, addr: u16, value: u8) {
        match addr {
            0x4000..=0x4003 => self.pulse1.write_register(addr, value),
            0x4004..=0x4007 => self.pulse2.write_register(addr, value),
            0x4008..=0x400B => self.triangle.write_register(addr, value),
            0x400C..=0x400F => self.noise.write_register(addr, value),
            0x4010..=0x4013 => self.dmc.write_register(addr, value),
            0x4015 => {
                self.pulse1.set_enabled(value & STATUS_PULSE1 != 0);
                self.pulse2.set_enabled(value & STATUS_PULSE2 != 0);
                self.triangle.set_enabled(value & STATUS_TRIANGLE != 0);
                self.noise.set_enabled(value & STATUS_NOISE != 0);
            }
            0x4017 => {
                let frame = self.frame_counter.write_register(value);
                if !self.frame_counter.irq_flag() {
                    self.interrupts.acknowledge_irq();
                }
                self.apply_frame_clock(frame);
            }
            _ => {}
        }
    }

    /// $4015 read: length counter status and the frame interrupt flag.
    /// Reading acknowledges the frame interrupt.
    pub fn read_status(&mut self) -> u8 {
        let mut status = 0;
        if self.pulse1.length_counter() > 0 {
            status |= STATUS_PULSE1;
        }
        if self.pulse2.length_counter() > 0 {
            status |= STATUS_PULSE2;
        }
        if self.triangle.length_counter() > 0 {
            status |= STATUS_TRIANGLE;
        }
        if self.noise.length_counter() > 0 {
            status |= STATUS_NOISE;
        }
        if self.frame_counter.irq_flag() {
            status |= STATUS_FRAME_IRQ;
            self.frame_counter.clear_irq_flag();
            self.interrupts.acknowledge_irq();
        }
        status
    }

    pub fn samples_mut(&mut self) -> &mut SampleBuffer {
        &mut self.samples
    }

    pub fn available_samples(&self) -> usize {
        self.samples.available()
    }

    /// Move `count` buffered samples into `dest`
    pub fn read_samples(&mut self, dest: &mut [f32], count: usize) -> Result<(), AudioError> {
        self.samples.read_into(dest, count)
    }

    pub fn frame_counter(&self) -> &FrameCounter {
        &self.frame_counter
    }

    pub fn pulse1(&self) -> &Pulse {
        &self.pulse1
    }

    pub fn pulse2(&self) -> &Pulse {
        &self.pulse2
    }

    pub fn triangle(&self) -> &Triangle {
        &self.triangle
    }

    pub fn noise(&self) -> &Noise {
        &self.noise
    }

    pub fn dmc(&self) -> &Dmc {
        &self.dmc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_apu() -> (Apu, InterruptLines) {
        let lines = InterruptLines::new();
        (Apu::new(TvSystem::Ntsc, lines.clone()), lines)
    }

    fn run(apu: &mut Apu, cycles: u32) {
        for _ in 0..cycles {
            apu.clock();
        }
    }

    #[test]
    fn test_apu_new_is_silent() {
        let (apu, _) = create_apu();
        assert_eq!(apu.pulse1().output(), 0);
        assert_eq!(apu.pulse2().output(), 0);
        assert_eq!(apu.noise().output(), 0);
        assert_eq!(apu.dmc().output(), 0);
        assert_eq!(apu.frame_counter().cycle(), 0);
    }

    #[test]
    fn test_status_reports_length_counters() {
        let (mut apu, _) = create_apu();
        apu.write_register(0x4015, 0x0F);
        apu.write_register(0x4003, 0x08);
        apu.write_register(0x400B, 0x08);
        assert_eq!(apu.read_status(), STATUS_PULSE1 | STATUS_TRIANGLE);

        apu.write_register(0x4015, 0x04);
        assert_eq!(apu.read_status(), STATUS_TRIANGLE);
    }

    #[test]
    fn test_disabled_channel_ignores_length_load() {
        let (mut apu, _) = create_apu();
        apu.write_register(0x4007, 0xF8);
        assert_eq!(apu.pulse2().length_counter(), 0);
        assert_eq!(apu.read_status(), 0);
    }

    #[test]
    fn test_half_frame_clocks_length_counters() {
        let (mut apu, _) = create_apu();
        apu.write_register(0x4015, 0x01);
        apu.write_register(0x4000, 0x00);
        apu.write_register(0x4003, 0b0001_0000);
        assert_eq!(apu.pulse1().length_counter(), 20);
        run(&mut apu, 14912);
        assert_eq!(apu.pulse1().length_counter(), 20);
        apu.clock();
        assert_eq!(apu.pulse1().length_counter(), 19);
    }

    #[test]
    fn test_five_step_write_clocks_half_frame() {
        let (mut apu, _) = create_apu();
        apu.write_register(0x4015, 0x08);
        apu.write_register(0x400F, 0b0001_0000);
        apu.write_register(0x4017, 0x80);
        assert_eq!(apu.noise().length_counter(), 19);
    }

    #[test]
    fn test_quarter_frame_clocks_linear_counter() {
        let (mut apu, _) = create_apu();
        apu.write_register(0x4008, 0x10);
        apu.write_register(0x400B, 0x00);
        run(&mut apu, 7457);
        assert_eq!(apu.triangle().linear_counter(), 0x10);
    }

    #[test]
    fn test_frame_irq_raises_and_status_read_acknowledges() {
        let (mut apu, lines) = create_apu();
        run(&mut apu, 29828);
        assert!(lines.irq_pending());
        let status = apu.read_status();
        assert_ne!(status & STATUS_FRAME_IRQ, 0);
        assert!(!lines.irq_pending());
        assert_eq!(apu.read_status() & STATUS_FRAME_IRQ, 0);
    }

    #[test]
    fn test_irq_inhibit_releases_line() {
        let (mut apu, lines) = create_apu();
        run(&mut apu, 29830);
        assert!(lines.irq_pending());
        apu.write_register(0x4017, 0x40);
        assert!(!lines.irq_pending());
        run(&mut apu, 29830 * 2);
        assert!(!lines.irq_pending());
    }

    #[test]
    fn test_five_step_mode_never_interrupts() {
        let (mut apu, lines) = create_apu();
        apu.write_register(0x4017, 0x80);
        run(&mut apu, 37282 * 2);
        assert!(!lines.irq_pending());
    }

    #[test]
    fn test_samples_follow_sample_rate() {
        let (mut apu, _) = create_apu();
        run(&mut apu, 1000);
        // floor(1000 * 44100 / 1789773)
        assert_eq!(apu.available_samples(), 24);

        // Nothing enabled: only the triangle's resting level
        let mut dest = [-1.0; 24];
        apu.read_samples(&mut dest, 24).expect("24 samples buffered");
        assert!(dest.iter().all(|&sample| sample == apu.output()));
        assert!(apu.read_samples(&mut dest, 1).is_err());
    }

    #[test]
    fn test_pulse_produces_sound() {
        let (mut apu, _) = create_apu();
        apu.write_register(0x4015, 0x01);
        apu.write_register(0x4000, 0b1011_1111);
        apu.write_register(0x4002, 0x20);
        apu.write_register(0x4003, 0x08);
        let resting = apu.output();
        run(&mut apu, 2000);
        let mut dest = vec![0.0; apu.available_samples()];
        let count = dest.len();
        apu.read_samples(&mut dest, count).expect("buffered samples");
        assert!(dest.iter().any(|&sample| sample > resting));
    }

    #[test]
    fn test_reset_silences_channels() {
        let (mut apu, _) = create_apu();
        apu.write_register(0x4015, 0x0F);
        apu.write_register(0x4003, 0x08);
        apu.write_register(0x4011, 0x40);
        apu.reset();
        assert_eq!(apu.read_status(), 0);
        assert_eq!(apu.dmc().output(), 0);
        assert_eq!(apu.available_samples(), 0);
    }
}
