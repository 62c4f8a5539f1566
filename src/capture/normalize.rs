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
use tracing::debug;

use crate::audio::buffer::DEFAULT_SAMPLE_RATE;
use crate::audio::SampleBuffer;
use crate::error::EngineError;

/// Peak normalizes raw capture chunks into fixed-point buffers.
#[derive(Clone, Copy, Debug)]
pub struct Normalizer {
    full_scale: i16,
    sample_rate: u32,
}

impl Normalizer {
    /// Creates a normalizer. A non-positive full scale is treated as 1.
    pub fn new(full_scale: i16, sample_rate: u32) -> Normalizer {
        Normalizer {
            full_scale: full_scale.max(1),
            sample_rate,
        }
    }

    /// Returns the magnitude of the loudest normalized sample.
    pub fn full_scale(&self) -> i16 {
        self.full_scale
    }

    /// Returns the sample rate stamped on produced buffers.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Concatenates the chunks in order and scales them so the loudest sample
    /// lands exactly on full scale.
    ///
    /// Non-finite input is treated as silence. A capture whose peak is zero
    /// yields [`EngineError::EmptyCapture`].
    pub fn normalize<C: AsRef<[f32]>>(&self, chunks: &[C]) -> Result<SampleBuffer, EngineError> {
        let peak = chunks
            .iter()
            .flat_map(|chunk| chunk.as_ref().iter())
            .filter(|s| s.is_finite())
            .fold(0.0f32, |peak, s| peak.max(s.abs()));

        if peak == 0.0 {
            return Err(EngineError::EmptyCapture);
        }

        let full_scale = self.full_scale as f64;
        let scale = full_scale / peak as f64;
        let frames: usize = chunks.iter().map(|chunk| chunk.as_ref().len()).sum();
        let mut samples = Vec::with_capacity(frames);
        for chunk in chunks {
            samples.extend(chunk.as_ref().iter().map(|&s| {
                if s.is_finite() {
                    (s as f64 * scale).round().clamp(-full_scale, full_scale) as i16
                } else {
                    0
                }
            }));
        }

        debug!(frames, peak, "Capture normalized");
        Ok(SampleBuffer::new(samples, self.sample_rate))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer::new(i16::MAX, DEFAULT_SAMPLE_RATE)
    }
}
