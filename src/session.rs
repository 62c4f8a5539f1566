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

//! Per-slot gesture handling.
//!
//! Every slot is Idle, Recording or Sounding. A press on an empty pad opens a
//! capture, a press on an occupied slot starts a looping voice and the matching
//! release finalizes the capture or stops the voice. Presses stack: a slot held
//! by both a pad and a key plays two voices, and each release stops the most
//! recent one. The slot goes back to Idle when its last hold is released, or
//! once every held voice has been cut or stolen by the voice pool.

use std::fmt;

use tracing::{debug, info, warn};

use crate::capture::{CapturePipeline, CaptureSession};
use crate::error::EngineError;
use crate::samples::{PlayMode, SlotId, TriggerEngine, VoiceHandle};

/// Where a gesture came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerSource {
    /// A sampler pad. Pads record into empty slots.
    Pad,
    /// A keyboard key. Keys only play slots that already hold audio.
    Key,
}

/// What a gesture did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureOutcome {
    /// A capture was opened for the slot.
    RecordingStarted,
    /// The capture was normalized and installed.
    Recorded { frames: usize },
    /// A looping voice was started.
    Triggered(VoiceHandle),
    /// A held voice was stopped. `idle` is true when no holds remain.
    Released { handle: VoiceHandle, idle: bool },
    /// The slot's buffer was removed.
    Deleted,
    /// The gesture had no effect in the slot's current state.
    Ignored,
}

/// Slot state as seen by a UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    Empty,
    Occupied,
    Recording,
    Sounding,
}

impl SlotStatus {
    /// Returns true if the slot holds a buffer.
    pub fn is_occupied(self) -> bool {
        matches!(self, SlotStatus::Occupied | SlotStatus::Sounding)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotStatus::Empty => "empty",
            SlotStatus::Occupied => "occupied",
            SlotStatus::Recording => "recording",
            SlotStatus::Sounding => "sounding",
        };
        write!(f, "{}", name)
    }
}

enum SlotActivity {
    Idle,
    Recording {
        source: TriggerSource,
        session: CaptureSession,
    },
    Sounding {
        holds: Vec<VoiceHandle>,
    },
}

impl SlotActivity {
    fn name(&self) -> &'static str {
        match self {
            SlotActivity::Idle => "idle",
            SlotActivity::Recording { .. } => "recording",
            SlotActivity::Sounding { .. } => "sounding",
        }
    }
}

/// Gesture state for every slot.
pub struct SessionMachine {
    slots: Vec<SlotActivity>,
}

impl SessionMachine {
    /// Creates a machine with every slot Idle.
    pub fn new(slot_count: usize) -> SessionMachine {
        SessionMachine {
            slots: (0..slot_count).map(|_| SlotActivity::Idle).collect(),
        }
    }

    fn activity(&self, slot: SlotId) -> Result<&SlotActivity, EngineError> {
        self.slots
            .get(slot.index())
            .ok_or(EngineError::UnknownSlot {
                slot,
                count: self.slots.len(),
            })
    }

    fn activity_mut(&mut self, slot: SlotId) -> Result<&mut SlotActivity, EngineError> {
        let count = self.slots.len();
        self.slots
            .get_mut(slot.index())
            .ok_or(EngineError::UnknownSlot { slot, count })
    }

    /// Returns true if the slot is capturing.
    pub fn is_recording(&self, slot: SlotId) -> bool {
        matches!(self.activity(slot), Ok(SlotActivity::Recording { .. }))
    }

    /// Returns true if the slot is held by at least one press.
    pub fn is_held(&self, slot: SlotId) -> bool {
        matches!(self.activity(slot), Ok(SlotActivity::Sounding { .. }))
    }

    /// Returns the number of presses holding the slot.
    pub fn hold_count(&self, slot: SlotId) -> usize {
        match self.activity(slot) {
            Ok(SlotActivity::Sounding { holds }) => holds.len(),
            _ => 0,
        }
    }

    /// Returns the slot's status.
    pub fn status(&self, slot: SlotId, engine: &TriggerEngine) -> Result<SlotStatus, EngineError> {
        let occupied = engine.is_occupied(slot)?;
        Ok(match self.activity(slot)? {
            SlotActivity::Recording { .. } => SlotStatus::Recording,
            SlotActivity::Sounding { holds }
                if holds.iter().any(|&h| engine.is_voice_sounding(h)) =>
            {
                SlotStatus::Sounding
            }
            _ if occupied => SlotStatus::Occupied,
            _ => SlotStatus::Empty,
        })
    }

    /// Forgets holds whose voices were cut or stolen. A slot left without a
    /// live hold goes back to Idle.
    pub fn prune_holds(
        &mut self,
        slot: SlotId,
        engine: &TriggerEngine,
    ) -> Result<(), EngineError> {
        let activity = self.activity_mut(slot)?;
        if let SlotActivity::Sounding { holds } = activity {
            let before = holds.len();
            holds.retain(|&h| engine.is_voice_sounding(h));
            if holds.len() < before {
                let dropped = before - holds.len();
                debug!(slot = %slot, dropped, "Dropped silenced holds");
            }
            if holds.is_empty() {
                *activity = SlotActivity::Idle;
            }
        }
        Ok(())
    }

    /// Rejects a gesture unless the slot is Idle.
    pub fn require_idle(&self, slot: SlotId, gesture: &'static str) -> Result<(), EngineError> {
        match self.activity(slot)? {
            SlotActivity::Idle => Ok(()),
            activity => Err(EngineError::InvalidGesture {
                slot,
                gesture,
                state: activity.name(),
            }),
        }
    }

    /// Handles a press.
    pub fn press(
        &mut self,
        slot: SlotId,
        source: TriggerSource,
        capture: &CapturePipeline,
        engine: &mut TriggerEngine,
    ) -> Result<GestureOutcome, EngineError> {
        self.prune_holds(slot, engine)?;
        let occupied = engine.is_occupied(slot)?;
        let activity = self.activity_mut(slot)?;

        match activity {
            SlotActivity::Recording { .. } => {
                debug!(slot = %slot, ?source, "Press ignored while recording");
                Ok(GestureOutcome::Ignored)
            }
            SlotActivity::Sounding { holds } => {
                match engine.trigger(slot, PlayMode::Loop)? {
                    Some(handle) => {
                        holds.push(handle);
                        debug!(slot = %slot, ?source, holds = holds.len(), "Hold stacked");
                        Ok(GestureOutcome::Triggered(handle))
                    }
                    None => Ok(GestureOutcome::Ignored),
                }
            }
            SlotActivity::Idle if occupied => match engine.trigger(slot, PlayMode::Loop)? {
                Some(handle) => {
                    *activity = SlotActivity::Sounding {
                        holds: vec![handle],
                    };
                    debug!(slot = %slot, ?source, "Slot sounding");
                    Ok(GestureOutcome::Triggered(handle))
                }
                None => Ok(GestureOutcome::Ignored),
            },
            SlotActivity::Idle => match source {
                TriggerSource::Key => {
                    debug!(slot = %slot, "Key press on empty slot ignored");
                    Ok(GestureOutcome::Ignored)
                }
                TriggerSource::Pad => {
                    let session = capture.begin(slot)?;
                    *activity = SlotActivity::Recording { source, session };
                    Ok(GestureOutcome::RecordingStarted)
                }
            },
        }
    }

    /// Handles a release.
    pub fn release(
        &mut self,
        slot: SlotId,
        source: TriggerSource,
        capture: &CapturePipeline,
        engine: &mut TriggerEngine,
    ) -> Result<GestureOutcome, EngineError> {
        self.prune_holds(slot, engine)?;
        let activity = self.activity_mut(slot)?;

        match activity {
            SlotActivity::Idle => Ok(GestureOutcome::Ignored),
            SlotActivity::Recording { source: owner, .. } if *owner != source => {
                debug!(slot = %slot, ?source, "Release from another source ignored");
                Ok(GestureOutcome::Ignored)
            }
            SlotActivity::Recording { .. } => {
                let SlotActivity::Recording { session, .. } =
                    std::mem::replace(activity, SlotActivity::Idle)
                else {
                    return Ok(GestureOutcome::Ignored);
                };
                match capture.end(session) {
                    Ok(buffer) => {
                        let frames = buffer.len();
                        engine.install(slot, buffer)?;
                        info!(slot = %slot, frames, "Recording stored");
                        Ok(GestureOutcome::Recorded { frames })
                    }
                    Err(e) => {
                        warn!(slot = %slot, error = %e, "Recording discarded");
                        Err(e)
                    }
                }
            }
            SlotActivity::Sounding { holds } => {
                let Some(handle) = holds.pop() else {
                    *activity = SlotActivity::Idle;
                    return Ok(GestureOutcome::Ignored);
                };
                engine.release(handle);
                let idle = holds.is_empty();
                if idle {
                    *activity = SlotActivity::Idle;
                    debug!(slot = %slot, "Slot idle");
                }
                Ok(GestureOutcome::Released { handle, idle })
            }
        }
    }

    /// Handles a delete press.
    pub fn delete(
        &mut self,
        slot: SlotId,
        engine: &mut TriggerEngine,
    ) -> Result<GestureOutcome, EngineError> {
        self.prune_holds(slot, engine)?;
        self.require_idle(slot, "delete")?;
        if !engine.is_occupied(slot)? {
            return Ok(GestureOutcome::Ignored);
        }
        engine.stop_all(slot);
        engine.clear(slot)?;
        Ok(GestureOutcome::Deleted)
    }

    /// Stops every held voice and abandons any open capture.
    pub fn reset(&mut self, engine: &mut TriggerEngine) {
        for activity in &mut self.slots {
            if let SlotActivity::Sounding { holds } = activity {
                for handle in holds.drain(..) {
                    engine.release(handle);
                }
            }
            *activity = SlotActivity::Idle;
        }
    }
}

impl fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMachine")
            .field("slots", &self.slots.len())
            .field(
                "recording",
                &self
                    .slots
                    .iter()
                    .any(|a| matches!(a, SlotActivity::Recording { .. })),
            )
            .finish()
    }
}
