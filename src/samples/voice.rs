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

//! Voice management for polyphonic sample playback.
//!
//! A [`Voice`] is the playback instance that lives in the mixer. The control
//! side keeps a lightweight record of every voice in the [`VoiceManager`] and
//! talks to the mixer only through the shared [`VoiceState`] flags.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::SlotId;
use crate::audio::SampleBuffer;
use crate::config::samples::RetriggerBehavior;

/// Global voice ID counter. IDs are monotonic, so a lower ID is an older voice.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// Converts a 16-bit sample to the [-1.0, 1.0) float range.
const SAMPLE_SCALE: f32 = 1.0 / 32768.0;

/// Channel for handing new voices to the mixer.
pub type VoiceSender = crossbeam_channel::Sender<Voice>;

/// Receiving end of the voice channel, owned by the mixer.
pub type VoiceReceiver = crossbeam_channel::Receiver<Voice>;

/// Identifies a voice returned by a trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle(u64);

impl VoiceHandle {
    /// Allocates a fresh handle.
    pub fn next() -> Self {
        VoiceHandle(NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric ID of this handle.
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Flags shared between the control side and the mixer for one voice.
#[derive(Debug, Default)]
pub struct VoiceState {
    /// Set by the control side to request a stop.
    stopped: AtomicBool,
    /// Set by the mixer once the voice has left the mix.
    finished: AtomicBool,
}

impl VoiceState {
    /// Requests that the voice stop at the next render.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Returns true if a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Marks the voice as no longer sounding.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Returns true if the voice is no longer sounding.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Returns true if the voice is neither stopped nor finished.
    pub fn is_sounding(&self) -> bool {
        !self.is_stopped() && !self.is_finished()
    }
}

/// A playback instance of a sample buffer.
pub struct Voice {
    /// Handle returned to the caller of the trigger.
    handle: VoiceHandle,
    /// The slot this voice was triggered from.
    slot: SlotId,
    /// Shared reference to the audio data.
    buffer: SampleBuffer,
    /// Whether the buffer repeats until released.
    looping: bool,
    /// Next frame to read.
    position: usize,
    /// Flags shared with the control side.
    state: Arc<VoiceState>,
}

impl Voice {
    /// Creates a new voice positioned at the start of the buffer.
    pub fn new(slot: SlotId, buffer: SampleBuffer, looping: bool) -> Self {
        Self {
            handle: VoiceHandle::next(),
            slot,
            buffer,
            looping,
            position: 0,
            state: Arc::new(VoiceState::default()),
        }
    }

    /// Returns the handle of this voice.
    pub fn handle(&self) -> VoiceHandle {
        self.handle
    }

    /// Returns the slot this voice was triggered from.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Returns true if the voice loops.
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Returns the buffer being played.
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Returns a clone of the shared state.
    pub fn state(&self) -> Arc<VoiceState> {
        self.state.clone()
    }

    /// Adds this voice into a mono block. Returns false once the voice is done.
    pub fn mix_into(&mut self, out: &mut [f32]) -> bool {
        if self.state.is_stopped() {
            return false;
        }
        let samples = self.buffer.samples();
        if samples.is_empty() {
            return false;
        }

        for frame in out.iter_mut() {
            if self.position >= samples.len() {
                if !self.looping {
                    return false;
                }
                self.position = 0;
            }
            *frame += f32::from(samples[self.position]) * SAMPLE_SCALE;
            self.position += 1;
        }

        self.looping || self.position < samples.len()
    }
}

/// Control-side record of a voice handed to the mixer.
struct TrackedVoice {
    handle: VoiceHandle,
    slot: SlotId,
    looping: bool,
    state: Arc<VoiceState>,
}

/// Manages active voices for sample playback.
pub struct VoiceManager {
    /// Tracked voices, oldest first.
    voices: Vec<TrackedVoice>,
    /// Global maximum voices limit.
    max_voices: usize,
}

impl VoiceManager {
    /// Creates a new voice manager.
    pub fn new(max_voices: usize) -> Self {
        Self {
            voices: Vec::with_capacity(max_voices),
            max_voices: max_voices.max(1),
        }
    }

    /// Returns the global voice limit.
    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// Starts tracking a voice, potentially stealing old voices if limits are exceeded.
    /// Returns the states of any voices that should be stopped.
    pub fn add_voice(
        &mut self,
        voice: &Voice,
        retrigger: RetriggerBehavior,
    ) -> Vec<Arc<VoiceState>> {
        self.prune();
        let mut voices_to_stop = Vec::new();

        if retrigger == RetriggerBehavior::Cut {
            voices_to_stop.extend(self.take_slot(voice.slot()));
        }

        if self.voices.len() >= self.max_voices {
            // Voices are kept in trigger order, so the first one is the oldest.
            let oldest = self.voices.remove(0);
            warn!(
                max_voices = self.max_voices,
                slot = %oldest.slot,
                "Global voice limit reached, stealing oldest"
            );
            voices_to_stop.push(oldest.state);
        }

        self.voices.push(TrackedVoice {
            handle: voice.handle(),
            slot: voice.slot(),
            looping: voice.is_looping(),
            state: voice.state(),
        });
        voices_to_stop
    }

    /// Stops tracking the given voice. Unknown handles return None.
    pub fn release(&mut self, handle: VoiceHandle) -> Option<Arc<VoiceState>> {
        let index = self.voices.iter().position(|v| v.handle == handle)?;
        Some(self.voices.remove(index).state)
    }

    /// Stops tracking every voice of the given slot and returns their states.
    pub fn stop_slot(&mut self, slot: SlotId) -> Vec<Arc<VoiceState>> {
        self.take_slot(slot).collect()
    }

    fn take_slot(&mut self, slot: SlotId) -> impl Iterator<Item = Arc<VoiceState>> {
        let (taken, kept): (Vec<_>, Vec<_>) = self.voices.drain(..).partition(|v| v.slot == slot);
        self.voices = kept;
        taken.into_iter().map(|v| v.state)
    }

    /// Forgets voices the mixer has finished with.
    pub fn prune(&mut self) -> usize {
        let before = self.voices.len();
        self.voices.retain(|v| !v.state.is_finished());
        let pruned = before - self.voices.len();
        if pruned > 0 {
            debug!(pruned, "Pruned finished voices");
        }
        pruned
    }

    /// Returns the number of voices that are still sounding.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.state.is_sounding()).count()
    }

    /// Returns the number of sounding voices for the given slot.
    pub fn slot_count(&self, slot: SlotId) -> usize {
        self.voices
            .iter()
            .filter(|v| v.slot == slot && v.state.is_sounding())
            .count()
    }

    /// Returns the number of sounding looping voices for the given slot.
    pub fn looping_count(&self, slot: SlotId) -> usize {
        self.voices
            .iter()
            .filter(|v| v.slot == slot && v.looping && v.state.is_sounding())
            .count()
    }

    /// Returns true if the handle belongs to a voice that is still sounding.
    pub fn is_sounding(&self, handle: VoiceHandle) -> bool {
        self.voices
            .iter()
            .any(|v| v.handle == handle && v.state.is_sounding())
    }

    /// Clears all voices.
    /// Returns the states of all voices that should be stopped.
    pub fn clear(&mut self) -> Vec<Arc<VoiceState>> {
        self.voices.drain(..).map(|v| v.state).collect()
    }
}

impl std::fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceManager")
            .field("tracked_voices", &self.voices.len())
            .field("max_voices", &self.max_voices)
            .finish()
    }
}
