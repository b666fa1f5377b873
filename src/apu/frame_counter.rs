use crate::nes::TvSystem;

/// Step thresholds in CPU cycles since the last sequencer reset
type StepTable = [u32; 6];

const NTSC_FOUR_STEP: StepTable = [7457, 14913, 22371, 29828, 29829, 29830];
const NTSC_FIVE_STEP: StepTable = [7457, 14913, 22371, 29829, 37281, 37282];
const PAL_FOUR_STEP: StepTable = [8313, 16627, 24939, 33252, 33253, 33254];
const PAL_FIVE_STEP: StepTable = [8313, 16627, 24939, 33253, 41565, 41566];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerMode {
    FourStep,
    FiveStep,
}

/// What a clock of the frame counter asks the channels to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameClock {
    /// Envelopes and the triangle linear counter
    pub quarter: bool,
    /// Length counters and sweep units
    pub half: bool,
}

impl FrameClock {
    const NONE: Self = Self { quarter: false, half: false };
    const QUARTER: Self = Self { quarter: true, half: false };
    const BOTH: Self = Self { quarter: true, half: true };
}

/// APU frame sequencer ($4017).
///
/// Steps are numbered 1-6. Steps 1, 2, 3 and 5 are quarter frames, steps 2
/// and 5 are also half frames. In 4-step mode steps 4, 5 and 6 raise the frame
/// interrupt. The counter restarts after step 6.
#[derive(Debug)]
pub struct FrameCounter {
    four_step: &'static StepTable,
    five_step: &'static StepTable,
    mode: SequencerMode,
    irq_inhibit: bool,
    irq_flag: bool,
    cycle: u32,
    /// Index of the next step to reach
    step: usize,
}

impl FrameCounter {
    pub fn new(tv_system: TvSystem) -> Self {
        let (four_step, five_step) = match tv_system {
            TvSystem::Ntsc => (&NTSC_FOUR_STEP, &NTSC_FIVE_STEP),
            TvSystem::Pal => (&PAL_FOUR_STEP, &PAL_FIVE_STEP),
        };
        Self {
            four_step,
            five_step,
            mode: SequencerMode::FourStep,
            irq_inhibit: false,
            irq_flag: false,
            cycle: 0,
            step: 0,
        }
    }

    pub fn reset(&mut self) {
        self.mode = SequencerMode::FourStep;
        self.irq_inhibit = false;
        self.irq_flag = false;
        self.cycle = 0;
        self.step = 0;
    }

    /// $4017 write: bit 7 selects 5-step mode, bit 6 inhibits the IRQ.
    ///
    /// Restarts the sequence. Selecting 5-step mode also clocks quarter and
    /// half frame immediately.
    pub fn write_register(&mut self, value: u8) -> FrameClock {
        self.mode = if value & 0x80 != 0 {
            SequencerMode::FiveStep
        } else {
            SequencerMode::FourStep
        };
        self.irq_inhibit = value & 0x40 != 0;
        if self.irq_inhibit {
            self.irq_flag = false;
        }
        self.cycle = 0;
        self.step = 0;

        match self.mode {
            SequencerMode::FiveStep => FrameClock::BOTH,
            SequencerMode::FourStep => FrameClock::NONE,
        }
    }

    /// Advance by one CPU cycle
    pub fn clock(&mut self) -> FrameClock {
        self.cycle += 1;
        let table = match self.mode {
            SequencerMode::FourStep => self.four_step,
            SequencerMode::FiveStep => self.five_step,
        };
        if self.cycle != table[self.step] {
            return FrameClock::NONE;
        }

        let step = self.step + 1;
        if self.mode == SequencerMode::FourStep && step >= 4 && !self.irq_inhibit {
            self.irq_flag = true;
        }
        if step == table.len() {
            self.cycle = 0;
            self.step = 0;
        } else {
            self.step = step;
        }

        match step {
            2 | 5 => FrameClock::BOTH,
            1 | 3 => FrameClock::QUARTER,
            _ => FrameClock::NONE,
        }
    }

    pub fn mode(&self) -> SequencerMode {
        self.mode
    }

    pub fn irq_inhibited(&self) -> bool {
        self.irq_inhibit
    }

    pub fn irq_flag(&self) -> bool {
        self.irq_flag
    }

    pub fn clear_irq_flag(&mut self) {
        self.irq_flag = false;
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }
}
