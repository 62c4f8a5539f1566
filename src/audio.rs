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

//! Audio data and the hardware boundary.
//!
//! This module provides:
//! - [`SampleBuffer`], the immutable fixed-point block exchanged between capture,
//!   normalization and playback
//! - the [`mixer::Mixer`] that renders voices inside the output callback
//! - the cpal device that runs the output and input streams

pub mod buffer;
pub mod cpal;
pub mod mixer;
mod thread_priority;

pub use buffer::SampleBuffer;

/// Lists the input and output devices known to cpal.
pub fn list_devices() -> Result<Vec<cpal::DeviceInfo>, Box<dyn std::error::Error>> {
    cpal::list_devices()
}
