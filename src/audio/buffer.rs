// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default sample rate for buffers produced by the engine.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// An immutable block of signed 16-bit mono audio.
///
/// The sample data is stored in an Arc so that every voice playing the buffer
/// shares it. Dropping a slot's copy never invalidates a voice that is still
/// sounding.
#[derive(Clone)]
pub struct SampleBuffer {
    /// The samples, one per frame.
    samples: Arc<[i16]>,
    /// Sample rate of the audio data.
    sample_rate: u32,
    /// Number of channels. The engine only produces mono buffers.
    channel_count: u16,
}

impl SampleBuffer {
    /// Creates a new mono buffer.
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channel_count: 1,
        }
    }

    /// Returns the raw samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Returns the number of frames.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Returns the playback duration.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Returns the largest absolute sample value.
    pub fn peak(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.samples.len() * std::mem::size_of::<i16>()
    }

    /// Returns true if both buffers share the same sample data.
    pub fn shares_data(&self, other: &SampleBuffer) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }

    /// Returns the number of live references to the sample data.
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.samples)
    }
}

/// Buffers are equal when they hold the same samples at the same rate, whether
/// or not they share storage.
impl PartialEq for SampleBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.sample_rate == other.sample_rate
            && self.channel_count == other.channel_count
            && self.samples[..] == other.samples[..]
    }
}

impl Eq for SampleBuffer {}

impl fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("frames", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channel_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_basics() {
        let buffer = SampleBuffer::new(vec![0, 100, -200, 50], 4);

        assert_eq!(buffer.len(), 4);
        assert!(!buffer.is_empty());
        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.peak(), 200);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
        assert_eq!(buffer.memory_size(), 8);
    }

    #[test]
    fn test_clones_share_data() {
        let buffer = SampleBuffer::new(vec![1, 2, 3], DEFAULT_SAMPLE_RATE);
        let clone = buffer.clone();

        assert!(buffer.shares_data(&clone));
        assert_eq!(buffer.reference_count(), 2);

        drop(buffer);
        assert_eq!(clone.reference_count(), 1);
        assert_eq!(clone.samples(), &[1, 2, 3]);
    }

    #[test]
    fn test_peak_of_minimum_value() {
        let buffer = SampleBuffer::new(vec![i16::MIN, 0], DEFAULT_SAMPLE_RATE);
        assert_eq!(buffer.peak(), 32768);
    }

    #[test]
    fn test_equality_compares_content() {
        let buffer = SampleBuffer::new(vec![1, -2, 3], 44100);
        let copy = SampleBuffer::new(vec![1, -2, 3], 44100);

        assert_eq!(buffer, copy);
        assert!(!buffer.shares_data(&copy));
        assert_eq!(buffer, buffer.clone());
        assert_ne!(buffer, SampleBuffer::new(vec![1, -2, 3], 48000));
        assert_ne!(buffer, SampleBuffer::new(vec![1, -2], 44100));
    }
}
