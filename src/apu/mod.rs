mod apu;
mod dmc;
mod envelope;
mod frame_counter;
mod mixer;
mod noise;
mod pulse;
mod samples;
mod triangle;

pub use apu::{Apu, DEFAULT_SAMPLE_RATE};
pub use dmc::Dmc;
pub use envelope::{Envelope, LengthCounter};
pub use frame_counter::{FrameClock, FrameCounter, SequencerMode};
pub use mixer::{ChannelLevels, mix};
pub use noise::Noise;
pub use pulse::{Pulse, PulseUnit};
pub use samples::SampleBuffer;
pub use triangle::Triangle;

/// Contract shared by the five sound channels.
///
/// The APU calls `clock_timer` every CPU cycle, `clock_envelope` on quarter
/// frames and `clock_length_counter` on half frames.
pub trait Channel {
    /// Current DAC input level
    fn output(&self) -> u8;
    fn clock_timer(&mut self);
    fn clock_envelope(&mut self);
    fn clock_length_counter(&mut self);
}
