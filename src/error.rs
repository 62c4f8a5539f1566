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
use crate::samples::SlotId;

/// Recoverable outcomes reported back to the caller of the engine.
///
/// None of these are fatal: the engine is left in a consistent state and the
/// caller may keep issuing gestures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The capture contained only silence (or nothing at all).
    #[error("capture contained no signal")]
    EmptyCapture,

    /// A capture was requested while another one is still open.
    #[error("a capture is already active for slot {active}")]
    CaptureAlreadyActive { active: SlotId },

    /// The gesture is not allowed in the slot's current state.
    #[error("gesture {gesture} rejected for slot {slot} while {state}")]
    InvalidGesture {
        slot: SlotId,
        gesture: &'static str,
        state: &'static str,
    },

    /// A zero-length buffer was offered to a slot.
    #[error("refusing to install an empty buffer into slot {0}")]
    EmptyBuffer(SlotId),

    /// The slot id is outside the configured registry.
    #[error("slot {slot} is out of range (slots: {count})")]
    UnknownSlot { slot: SlotId, count: usize },

    /// The pattern cell is outside the configured matrix.
    #[error("step ({row}, {column}) is out of range ({rows}x{steps})")]
    InvalidStep {
        row: usize,
        column: usize,
        rows: usize,
        steps: usize,
    },
}
