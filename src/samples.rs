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

//! Slot-triggered sample playback.
//!
//! This module provides:
//! - The slot registry (pads, keys and sequencer rows all address slots)
//! - Trigger/release/stop handling for slots
//! - Voice management with a global polyphony limit
//! - The hand-off of new voices to the audio mixer

mod engine;
mod voice;

use std::fmt;

pub use engine::{PlayMode, TriggerEngine};
pub use voice::{Voice, VoiceHandle, VoiceManager, VoiceReceiver, VoiceSender, VoiceState};

/// Identifies a pad, key or instrument slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u16);

impl SlotId {
    /// Returns the slot as a registry index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for SlotId {
    fn from(value: u16) -> Self {
        SlotId(value)
    }
}
