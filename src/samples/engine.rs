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

//! Trigger engine that owns the slot registry and starts, loops and stops voices.

use tracing::{debug, error, info};

use super::voice::{Voice, VoiceHandle, VoiceManager, VoiceSender};
use super::SlotId;
use crate::audio::SampleBuffer;
use crate::config::samples::RetriggerBehavior;
use crate::error::EngineError;

/// How a triggered voice should play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayMode {
    /// Play the buffer once and stop at its end.
    OneShot,
    /// Repeat the buffer until the voice is released.
    Loop,
}

/// The trigger engine manages slot contents and voice playback.
///
/// All methods run on the control context. New voices are handed to the mixer
/// through a channel and stopped through their shared state, so nothing here
/// ever waits on the audio callback.
pub struct TriggerEngine {
    /// Buffer per slot. Index is the slot ID.
    slots: Vec<Option<SampleBuffer>>,
    /// Voice manager for polyphony.
    voice_manager: VoiceManager,
    /// Channel for adding voices without lock contention.
    voice_tx: VoiceSender,
    /// What happens when a slot is triggered while it is still sounding.
    retrigger: RetriggerBehavior,
}

impl TriggerEngine {
    /// Creates a new trigger engine with `slot_count` empty slots.
    pub fn new(
        slot_count: usize,
        max_voices: usize,
        retrigger: RetriggerBehavior,
        voice_tx: VoiceSender,
    ) -> Self {
        Self {
            slots: vec![None; slot_count],
            voice_manager: VoiceManager::new(max_voices),
            voice_tx,
            retrigger,
        }
    }

    /// Returns the number of slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn check_slot(&self, slot: SlotId) -> Result<usize, EngineError> {
        let index = slot.index();
        if index >= self.slots.len() {
            return Err(EngineError::UnknownSlot {
                slot,
                count: self.slots.len(),
            });
        }
        Ok(index)
    }

    /// Returns the buffer held by the slot, if any.
    pub fn buffer(&self, slot: SlotId) -> Result<Option<&SampleBuffer>, EngineError> {
        let index = self.check_slot(slot)?;
        Ok(self.slots[index].as_ref())
    }

    /// Returns true if the slot holds a buffer.
    pub fn is_occupied(&self, slot: SlotId) -> Result<bool, EngineError> {
        Ok(self.buffer(slot)?.is_some())
    }

    /// Returns true if any voice of the slot is still sounding.
    pub fn is_sounding(&self, slot: SlotId) -> bool {
        self.voice_manager.slot_count(slot) > 0
    }

    /// Returns true if the voice is still sounding.
    pub fn is_voice_sounding(&self, handle: VoiceHandle) -> bool {
        self.voice_manager.is_sounding(handle)
    }

    /// Returns the number of sounding voices for the slot.
    pub fn slot_voice_count(&self, slot: SlotId) -> usize {
        self.voice_manager.slot_count(slot)
    }

    /// Returns the number of sounding voices.
    pub fn active_voice_count(&self) -> usize {
        self.voice_manager.active_count()
    }

    /// Returns the total memory held by slot buffers.
    pub fn memory_usage(&self) -> usize {
        self.slots.iter().flatten().map(SampleBuffer::memory_size).sum()
    }

    /// Installs a buffer into a slot, replacing and returning any previous one.
    ///
    /// Voices of the previous buffer are stopped first. They keep their own
    /// reference to the data until the mixer drops them.
    pub fn install(
        &mut self,
        slot: SlotId,
        buffer: SampleBuffer,
    ) -> Result<Option<SampleBuffer>, EngineError> {
        let index = self.check_slot(slot)?;
        if buffer.is_empty() {
            return Err(EngineError::EmptyBuffer(slot));
        }

        self.stop_all(slot);
        info!(
            slot = %slot,
            frames = buffer.len(),
            duration_ms = buffer.duration().as_millis(),
            "Slot loaded"
        );
        Ok(self.slots[index].replace(buffer))
    }

    /// Stops all voices of the slot and empties it.
    pub fn clear(&mut self, slot: SlotId) -> Result<Option<SampleBuffer>, EngineError> {
        let index = self.check_slot(slot)?;
        self.stop_all(slot);
        let previous = self.slots[index].take();
        if previous.is_some() {
            info!(slot = %slot, "Slot cleared");
        }
        Ok(previous)
    }

    /// Triggers the slot. An empty slot is inert and yields no handle.
    pub fn trigger(
        &mut self,
        slot: SlotId,
        mode: PlayMode,
    ) -> Result<Option<VoiceHandle>, EngineError> {
        let index = self.check_slot(slot)?;
        let buffer = match &self.slots[index] {
            Some(buffer) => buffer.clone(),
            None => {
                debug!(slot = %slot, "Trigger on empty slot ignored");
                return Ok(None);
            }
        };

        let voice = Voice::new(slot, buffer, mode == PlayMode::Loop);
        let handle = voice.handle();

        // Stop stolen or cut voices before the new one can be mixed.
        for state in self.voice_manager.add_voice(&voice, self.retrigger) {
            state.stop();
        }

        // Send via channel - the audio callback adds it to the mix.
        if let Err(e) = self.voice_tx.send(voice) {
            error!(error = %e, slot = %slot, "Failed to send voice to mixer");
            self.voice_manager.release(handle);
            return Ok(None);
        }

        debug!(slot = %slot, voice = handle.id(), ?mode, "Slot triggered");
        Ok(Some(handle))
    }

    /// Stops a voice. Unknown or already stopped handles are ignored.
    pub fn release(&mut self, handle: VoiceHandle) -> bool {
        match self.voice_manager.release(handle) {
            Some(state) => {
                let was_sounding = state.is_sounding();
                state.stop();
                debug!(voice = handle.id(), "Voice released");
                was_sounding
            }
            None => false,
        }
    }

    /// Stops every voice playing from the slot. Returns how many were stopped.
    pub fn stop_all(&mut self, slot: SlotId) -> usize {
        let to_stop = self.voice_manager.stop_slot(slot);
        let stopped = to_stop.iter().filter(|state| state.is_sounding()).count();
        for state in to_stop {
            state.stop();
        }
        if stopped > 0 {
            debug!(slot = %slot, stopped, "Slot voices stopped");
        }
        stopped
    }

    /// Stops all sample playback.
    pub fn stop_everything(&mut self) {
        let to_stop = self.voice_manager.clear();
        let stopped_count = to_stop.len();
        for state in to_stop {
            state.stop();
        }

        if stopped_count > 0 {
            info!(stopped = stopped_count, "All voices stopped");
        }
    }

    /// Forgets voices the mixer has finished with.
    pub fn prune(&mut self) {
        self.voice_manager.prune();
    }
}

impl std::fmt::Debug for TriggerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerEngine")
            .field("slots", &self.slots.len())
            .field("occupied", &self.slots.iter().flatten().count())
            .field("active_voices", &self.active_voice_count())
            .field("memory_kb", &(self.memory_usage() / 1024))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::VoiceReceiver;

    fn create_engine(retrigger: RetriggerBehavior) -> (TriggerEngine, VoiceReceiver) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (TriggerEngine::new(8, 32, retrigger, tx), rx)
    }

    fn buffer() -> SampleBuffer {
        SampleBuffer::new(vec![1000, -1000, 500], 44100)
    }

    #[test]
    fn test_engine_creation() {
        let (engine, _rx) = create_engine(RetriggerBehavior::Polyphonic);

        assert_eq!(engine.slot_count(), 8);
        assert_eq!(engine.active_voice_count(), 0);
        assert_eq!(engine.memory_usage(), 0);
    }

    #[test]
    fn test_trigger_empty_slot_is_inert() {
        let (mut engine, rx) = create_engine(RetriggerBehavior::Polyphonic);

        assert_eq!(engine.trigger(SlotId(3), PlayMode::Loop), Ok(None));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_trigger_unknown_slot() {
        let (mut engine, _rx) = create_engine(RetriggerBehavior::Polyphonic);

        assert_eq!(
            engine.trigger(SlotId(8), PlayMode::OneShot),
            Err(EngineError::UnknownSlot {
                slot: SlotId(8),
                count: 8
            })
        );
    }

    #[test]
    fn test_trigger_sends_voice_sharing_buffer() {
        let (mut engine, rx) = create_engine(RetriggerBehavior::Polyphonic);
        engine.install(SlotId(1), buffer()).unwrap();

        let handle = engine.trigger(SlotId(1), PlayMode::Loop).unwrap().unwrap();
        let voice = rx.try_recv().unwrap();

        assert_eq!(voice.handle(), handle);
        assert_eq!(voice.slot(), SlotId(1));
        assert!(voice.is_looping());
        let held = engine.buffer(SlotId(1)).unwrap().unwrap();
        assert!(voice.buffer().shares_data(held));
        assert!(engine.is_sounding(SlotId(1)));
    }

    #[test]
    fn test_release_is_silent_for_unknown_handles() {
        let (mut engine, _rx) = create_engine(RetriggerBehavior::Polyphonic);
        engine.install(SlotId(0), buffer()).unwrap();
        let handle = engine.trigger(SlotId(0), PlayMode::Loop).unwrap().unwrap();

        assert!(engine.release(handle));
        assert!(!engine.release(handle));
        assert!(!engine.release(VoiceHandle::next()));
        assert!(!engine.is_sounding(SlotId(0)));
    }

    #[test]
    fn test_release_after_self_termination() {
        let (mut engine, rx) = create_engine(RetriggerBehavior::Polyphonic);
        engine.install(SlotId(0), buffer()).unwrap();
        let handle = engine.trigger(SlotId(0), PlayMode::OneShot).unwrap().unwrap();

        // The mixer finishes the one-shot.
        rx.try_recv().unwrap().state().finish();
        assert!(!engine.release(handle));
    }

    #[test]
    fn test_stop_all_stops_every_voice_of_slot() {
        let (mut engine, rx) = create_engine(RetriggerBehavior::Polyphonic);
        engine.install(SlotId(0), buffer()).unwrap();
        engine.install(SlotId(1), buffer()).unwrap();

        engine.trigger(SlotId(0), PlayMode::Loop).unwrap();
        engine.trigger(SlotId(0), PlayMode::OneShot).unwrap();
        engine.trigger(SlotId(1), PlayMode::Loop).unwrap();
        let voices: Vec<Voice> = rx.try_iter().collect();

        assert_eq!(engine.stop_all(SlotId(0)), 2);
        assert!(voices[0].state().is_stopped());
        assert!(voices[1].state().is_stopped());
        assert!(!voices[2].state().is_stopped());
    }

    #[test]
    fn test_install_replaces_and_stops_old_voices() {
        let (mut engine, rx) = create_engine(RetriggerBehavior::Polyphonic);
        engine.install(SlotId(2), buffer()).unwrap();
        engine.trigger(SlotId(2), PlayMode::Loop).unwrap();
        let voice = rx.try_recv().unwrap();

        let replacement = SampleBuffer::new(vec![7, 8, 9, 10], 44100);
        let previous = engine.install(SlotId(2), replacement).unwrap().unwrap();

        assert!(voice.state().is_stopped());
        // The voice still holds the old data even though the slot moved on.
        assert!(voice.buffer().shares_data(&previous));
        assert_eq!(engine.buffer(SlotId(2)).unwrap().unwrap().len(), 4);
    }

    #[test]
    fn test_install_rejects_empty_buffer() {
        let (mut engine, _rx) = create_engine(RetriggerBehavior::Polyphonic);
        let empty = SampleBuffer::new(Vec::new(), 44100);

        assert_eq!(
            engine.install(SlotId(0), empty),
            Err(EngineError::EmptyBuffer(SlotId(0)))
        );
        assert!(!engine.is_occupied(SlotId(0)).unwrap());
    }

    #[test]
    fn test_cut_retrigger_stops_previous_voice() {
        let (mut engine, rx) = create_engine(RetriggerBehavior::Cut);
        engine.install(SlotId(0), buffer()).unwrap();

        engine.trigger(SlotId(0), PlayMode::OneShot).unwrap();
        engine.trigger(SlotId(0), PlayMode::OneShot).unwrap();
        let voices: Vec<Voice> = rx.try_iter().collect();

        assert!(voices[0].state().is_stopped());
        assert!(!voices[1].state().is_stopped());
        assert_eq!(engine.slot_voice_count(SlotId(0)), 1);
    }

    #[test]
    fn test_trigger_with_mixer_gone() {
        let (mut engine, rx) = create_engine(RetriggerBehavior::Polyphonic);
        engine.install(SlotId(0), buffer()).unwrap();
        drop(rx);

        assert_eq!(engine.trigger(SlotId(0), PlayMode::Loop), Ok(None));
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn test_clear_empties_slot() {
        let (mut engine, _rx) = create_engine(RetriggerBehavior::Polyphonic);
        engine.install(SlotId(4), buffer()).unwrap();

        assert!(engine.clear(SlotId(4)).unwrap().is_some());
        assert!(!engine.is_occupied(SlotId(4)).unwrap());
        assert!(engine.clear(SlotId(4)).unwrap().is_none());
    }
}
