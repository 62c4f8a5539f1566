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

//! Microphone capture for empty slots.
//!
//! The input callback holds a [`CaptureInput`] and pushes frames into whatever
//! capture is open. The control context opens a capture with
//! [`CapturePipeline::begin`] and finalizes it with [`CapturePipeline::end`],
//! which closes the session before reading so no frame can arrive mid-read.
//! The result is peak normalized into a [`crate::audio::SampleBuffer`].

mod normalize;
mod pipeline;

pub use normalize::Normalizer;
pub use pipeline::{CaptureInput, CapturePipeline, CaptureSession};
