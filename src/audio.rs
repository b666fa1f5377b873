use sdl2::AudioSubsystem;
use sdl2::audio::{AudioQueue, AudioSpecDesired};
use tracing::{debug, info};

use crate::apu::Apu;
use crate::error::NesError;

/// Queued audio beyond this many milliseconds is latency, not buffering
const MAX_LATENCY_MS: u32 = 100;

/// SDL2 playback queue fed with APU samples once per frame
pub struct AudioOutput {
    queue: AudioQueue<f32>,
    sample_rate: u32,
    scratch: Vec<f32>,
}

impl AudioOutput {
    /// Open a mono f32 queue at `sample_rate`. The device may pick a
    /// different rate; [`AudioOutput::sample_rate`] reports the one in use.
    pub fn new(audio: &AudioSubsystem, sample_rate: u32) -> Result<Self, NesError> {
        let desired = AudioSpecDesired {
            freq: i32::try_from(sample_rate).ok(),
            channels: Some(1),
            samples: None,
        };
        let queue = audio
            .open_queue::<f32, _>(None, &desired)
            .map_err(NesError::Frontend)?;
        let sample_rate = u32::try_from(queue.spec().freq).unwrap_or(sample_rate);
        info!(sample_rate, "audio device opened");

        Ok(Self {
            queue,
            sample_rate,
            scratch: Vec::new(),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn resume(&self) {
        self.queue.resume();
    }

    pub fn pause(&self) {
        self.queue.pause();
    }

    /// Move every buffered APU sample into the device queue, dropping them
    /// instead when the device is already far behind
    pub fn pump(&mut self, apu: &mut Apu) -> Result<(), NesError> {
        let available = apu.available_samples();
        let queued = self.queue.size() as usize / size_of::<f32>();
        let count = queue_budget(available, queued, self.sample_rate);
        if count < available {
            debug!(dropped = available - count, queued, "audio queue full");
        }

        self.scratch.resize(count, 0.0);
        apu.read_samples(&mut self.scratch, count)?;
        apu.samples_mut().clear();
        self.queue.queue_audio(&self.scratch).map_err(NesError::Frontend)
    }
}

/// How many of `available` samples fit without pushing the device queue past
/// the latency cap
fn queue_budget(available: usize, queued: usize, sample_rate: u32) -> usize {
    let cap = (sample_rate * MAX_LATENCY_MS / 1000) as usize;
    available.min(cap.saturating_sub(queued))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_passes_everything_when_queue_is_short() {
        assert_eq!(queue_budget(735, 0, 44_100), 735);
        assert_eq!(queue_budget(735, 1000, 44_100), 735);
    }

    #[test]
    fn test_budget_caps_latency() {
        // 100ms at 44.1kHz
        assert_eq!(queue_budget(735, 4000, 44_100), 410);
        assert_eq!(queue_budget(735, 4410, 44_100), 0);
        assert_eq!(queue_budget(735, 9000, 44_100), 0);
    }
}
