use std::collections::VecDeque;

use crate::error::AudioError;

/// Samples kept before the oldest are dropped, about 0.2 s at 44.1 kHz
pub const DEFAULT_CAPACITY: usize = 8192;

/// Bounded FIFO of mixed samples between the APU and an audio consumer.
///
/// When the consumer falls behind the oldest samples are discarded.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleBuffer {
    /// A zero capacity is raised to one so the drop-oldest bound still holds
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: f32) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn available(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Move the `count` oldest samples into the front of `dest`.
    ///
    /// Fails without consuming anything when fewer than `count` samples are
    /// buffered or `dest` cannot hold them.
    pub fn read_into(&mut self, dest: &mut [f32], count: usize) -> Result<(), AudioError> {
        if count > self.samples.len() {
            return Err(AudioError::NotEnoughSamples {
                requested: count,
                available: self.samples.len(),
            });
        }
        if dest.len() < count {
            return Err(AudioError::DestinationTooSmall {
                requested: count,
                capacity: dest.len(),
            });
        }
        for (slot, sample) in dest.iter_mut().zip(self.samples.drain(..count)) {
            *slot = sample;
        }
        Ok(())
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
