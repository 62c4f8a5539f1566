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
use serde::Deserialize;

use crate::audio::buffer::DEFAULT_SAMPLE_RATE;

const DEFAULT_CHANNELS: u16 = 1;
const DEFAULT_FULL_SCALE: i16 = i16::MAX;

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Audio {
    /// Sample rate of captured and generated buffers in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Channel count of stored buffers. Only mono is supported (default: 1).
    channels: Option<u16>,

    /// Largest magnitude a normalized capture reaches (default: 32767).
    full_scale: Option<i16>,

    /// Output device name. The host's default output is used when unset.
    output_device: Option<String>,

    /// Input device name. The host's default input is used when unset.
    input_device: Option<String>,

    /// Fixed stream buffer size in frames. The backend default is used when unset.
    /// Lower values mean lower latency but more sensitivity to callback jitter.
    buffer_size: Option<u32>,

    /// Priority (0-99) for the audio callback thread. Overrides BEETBOX_THREAD_PRIORITY.
    callback_priority: Option<u8>,
}

impl Audio {
    /// Returns the sample rate (default: 44100).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the stored channel count (default: 1).
    pub fn channels(&self) -> u16 {
        self.channels.unwrap_or(DEFAULT_CHANNELS)
    }

    /// Returns the normalization full scale (default: 32767).
    pub fn full_scale(&self) -> i16 {
        self.full_scale.unwrap_or(DEFAULT_FULL_SCALE)
    }

    /// Returns the configured output device, if any.
    pub fn output_device(&self) -> Option<&str> {
        self.output_device.as_deref()
    }

    /// Returns the configured input device, if any.
    pub fn input_device(&self) -> Option<&str> {
        self.input_device.as_deref()
    }

    /// Returns the fixed stream buffer size, if any.
    pub fn buffer_size(&self) -> Option<u32> {
        self.buffer_size
    }

    /// Returns the configured callback thread priority, if any.
    pub fn callback_priority(&self) -> Option<u8> {
        self.callback_priority
    }
}
