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

//! A real-time audio event engine for sampler pads, step sequencers and
//! keyboard toys.
//!
//! The [`engine::Engine`] is the single context object the UI layer talks to.
//! It owns the slot registry, the voice pool, the capture pipeline, the
//! pattern matrix and the pattern clock. Audio hardware only ever sees the
//! [`engine::EnginePorts`] handed out at construction: a [`audio::mixer::Mixer`]
//! for the output callback and a [`capture::CaptureInput`] for the input
//! callback.

pub mod audio;
pub mod capture;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod kit;
pub mod samples;
pub mod sequencer;
pub mod session;

#[cfg(test)]
mod testutil;

pub use engine::{Engine, EnginePorts};
pub use error::EngineError;
pub use samples::SlotId;
