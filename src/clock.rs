use std::thread;
use std::time::{Duration, Instant};

/// Time left to the deadline that is spun away rather than slept, covering
/// scheduler wake-up latency
const SPIN_MARGIN: Duration = Duration::from_millis(2);

/// CPU cycles per PPU dot as an exact fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockRatio {
    numerator: u32,
    denominator: u32,
}

impl ClockRatio {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self { numerator, denominator }
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

/// Timing constants of one video standard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockDescriptor {
    pub frames_per_second: f64,
    pub ppu_dots_per_frame: u32,
    pub cpu_clocks_per_ppu_dot: ClockRatio,
}

impl ClockDescriptor {
    pub const NTSC: Self = Self {
        frames_per_second: 60.0988,
        ppu_dots_per_frame: 341 * 262,
        cpu_clocks_per_ppu_dot: ClockRatio::new(1, 3),
    };

    /// One CPU cycle every 3.2 dots
    pub const PAL: Self = Self {
        frames_per_second: 50.007,
        ppu_dots_per_frame: 341 * 312,
        cpu_clocks_per_ppu_dot: ClockRatio::new(5, 16),
    };

    /// Wall-clock length of a frame at `speed` times real time. A speed that
    /// yields no finite positive period means unpaced.
    pub fn frame_duration(&self, speed: f64) -> Duration {
        Duration::try_from_secs_f64(1.0 / (self.frames_per_second * speed))
            .unwrap_or(Duration::ZERO)
    }
}

/// Integer accumulator deciding how many CPU cycles follow each PPU dot.
///
/// After N ticks exactly floor(N * ratio) cycles have been handed out, so
/// fractional ratios never drift.
#[derive(Debug, Clone)]
pub struct FractionalClock {
    ratio: ClockRatio,
    accumulator: u32,
}

impl FractionalClock {
    pub fn new(ratio: ClockRatio) -> Self {
        Self { ratio, accumulator: 0 }
    }

    /// Account for one PPU dot, returning the CPU cycles now due
    pub fn tick(&mut self) -> u32 {
        self.accumulator += self.ratio.numerator;
        let cycles = self.accumulator / self.ratio.denominator;
        self.accumulator %= self.ratio.denominator;
        cycles
    }

    pub fn reset(&mut self) {
        self.accumulator = 0;
    }
}

/// Real-time frame pacing: sleep until shortly before the deadline, then spin.
///
/// Deadlines advance by a fixed period so small oversleeps do not accumulate.
/// After falling more than a frame behind the schedule restarts from now
/// instead of running frames back to back to catch up.
#[derive(Debug)]
pub struct FramePacer {
    period: Duration,
    next_deadline: Option<Instant>,
}

impl FramePacer {
    pub fn new(descriptor: &ClockDescriptor, speed: f64) -> Self {
        Self {
            period: descriptor.frame_duration(speed),
            next_deadline: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Block until the current frame's slot has elapsed
    pub fn wait(&mut self) {
        let now = Instant::now();
        let deadline = *self.next_deadline.get_or_insert(now + self.period);

        if deadline <= now {
            self.next_deadline = Some(now + self.period);
            return;
        }

        let remaining = deadline - now;
        if remaining > SPIN_MARGIN {
            thread::sleep(remaining - SPIN_MARGIN);
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
        self.next_deadline = Some(deadline + self.period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use serial_test::serial;

    fn cycles_after(ratio: ClockRatio, dots: u64) -> u64 {
        let mut clock = FractionalClock::new(ratio);
        (0..dots).map(|_| u64::from(clock.tick())).sum()
    }

    #[test]
    fn test_ntsc_one_cycle_every_third_dot() {
        let mut clock = FractionalClock::new(ClockDescriptor::NTSC.cpu_clocks_per_ppu_dot);
        let ticks: Vec<u32> = (0..6).map(|_| clock.tick()).collect();
        assert_eq!(ticks, vec![0, 0, 1, 0, 0, 1]);
    }

    #[test]
    fn test_pal_five_cycles_per_sixteen_dots() {
        let ratio = ClockDescriptor::PAL.cpu_clocks_per_ppu_dot;
        assert_eq!(cycles_after(ratio, 16), 5);
        assert_eq!(cycles_after(ratio, 32), 10);
        assert!((ratio.as_f64() - 1.0 / 3.2).abs() < 1e-12);
    }

    #[test]
    fn test_total_is_floor_of_dots_times_ratio() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let numerator = rng.random_range(1..8u32);
            let denominator = rng.random_range(numerator..32u32);
            let dots = rng.random_range(0..20_000u64);
            let ratio = ClockRatio::new(numerator, denominator);
            let expected = dots * u64::from(numerator) / u64::from(denominator);
            assert_eq!(
                cycles_after(ratio, dots),
                expected,
                "{}/{} over {}",
                numerator,
                denominator,
                dots
            );
        }
    }

    #[test]
    fn test_cycles_per_frame() {
        let ntsc = ClockDescriptor::NTSC;
        let cycles = cycles_after(ntsc.cpu_clocks_per_ppu_dot, u64::from(ntsc.ppu_dots_per_frame));
        assert_eq!(cycles, 29780);

        let pal = ClockDescriptor::PAL;
        let cycles = cycles_after(pal.cpu_clocks_per_ppu_dot, u64::from(pal.ppu_dots_per_frame));
        assert_eq!(cycles, 33247);
    }

    #[test]
    fn test_frame_duration_scales_with_speed() {
        let ntsc = ClockDescriptor::NTSC;
        let normal = ntsc.frame_duration(1.0);
        assert!(normal > Duration::from_micros(16_600) && normal < Duration::from_micros(16_700));
        let double = ntsc.frame_duration(2.0);
        assert!(double < normal);
    }

    #[test]
    fn test_frame_duration_unpaced_for_unusable_speed() {
        let ntsc = ClockDescriptor::NTSC;
        assert_eq!(ntsc.frame_duration(0.0), Duration::ZERO);
        assert_eq!(ntsc.frame_duration(-1.0), Duration::ZERO);
        assert_eq!(ntsc.frame_duration(f64::NAN), Duration::ZERO);
        let pacer = FramePacer::new(&ntsc, 0.0);
        assert_eq!(pacer.period(), Duration::ZERO);
    }

    #[test]
    #[serial]
    fn test_pacer_holds_frame_rate() {
        let descriptor = ClockDescriptor {
            frames_per_second: 100.0,
            ..ClockDescriptor::NTSC
        };
        let mut pacer = FramePacer::new(&descriptor, 1.0);
        let start = Instant::now();
        for _ in 0..5 {
            pacer.wait();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(250), "{:?}", elapsed);
    }

    #[test]
    #[serial]
    fn test_pacer_resyncs_after_stall() {
        let descriptor = ClockDescriptor {
            frames_per_second: 100.0,
            ..ClockDescriptor::NTSC
        };
        let mut pacer = FramePacer::new(&descriptor, 1.0);
        pacer.wait();
        thread::sleep(Duration::from_millis(40));
        // Behind schedule: returns at once instead of waiting
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() < Duration::from_millis(5));
        // Next frame is a full period away again
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() >= Duration::from_millis(9));
    }
}
