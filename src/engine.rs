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
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::mixer::Mixer;
use crate::audio::SampleBuffer;
use crate::capture::{CaptureInput, CapturePipeline, Normalizer};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::samples::{PlayMode, SlotId, TriggerEngine, VoiceReceiver};
use crate::sequencer::{PatternClock, PatternMatrix};
use crate::session::{GestureOutcome, SessionMachine, SlotStatus, TriggerSource};

/// The audio-side halves of the engine, handed to the device callbacks.
pub struct EnginePorts {
    /// Renders voices in the output callback.
    pub mixer: Mixer,
    /// Feeds microphone frames from the input callback.
    pub capture_input: CaptureInput,
}

/// The engine context. Every gesture, transport command and query goes
/// through here, on a single control thread.
pub struct Engine {
    triggers: TriggerEngine,
    capture: CapturePipeline,
    session: SessionMachine,
    pattern: PatternMatrix,
    clock: PatternClock,
    /// Voices the mixer has finished with. Dropped here, off the audio thread.
    retired: VoiceReceiver,
    instruments: Vec<String>,
    bpm_increment: f64,
    sample_rate: u32,
}

impl Engine {
    /// Builds an engine from a validated configuration.
    pub fn new(config: &EngineConfig) -> (Engine, EnginePorts) {
        let audio = config.audio();
        let sequencer = config.sequencer();
        let samples = config.samples();

        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        // Stolen voices can still be in the mixer next to a full pool.
        let (retired_tx, retired) = crossbeam_channel::bounded(samples.max_voices() * 2);
        let triggers = TriggerEngine::new(
            samples.slots(),
            samples.max_voices(),
            samples.retrigger(),
            voice_tx,
        );
        let normalizer = Normalizer::new(audio.full_scale(), audio.sample_rate());
        let (capture, capture_input) = CapturePipeline::new(normalizer);
        let instruments = sequencer.instruments();

        let engine = Engine {
            triggers,
            capture,
            session: SessionMachine::new(samples.slots()),
            pattern: PatternMatrix::new(instruments.len(), sequencer.steps()),
            clock: PatternClock::new(
                sequencer.steps(),
                sequencer.steps_per_beat(),
                sequencer.bpm(),
                sequencer.min_bpm(),
                sequencer.max_bpm(),
            ),
            retired,
            instruments,
            bpm_increment: sequencer.bpm_increment(),
            sample_rate: audio.sample_rate(),
        };
        info!(
            slots = samples.slots(),
            rows = engine.pattern.rows(),
            steps = engine.pattern.steps(),
            bpm = engine.clock.bpm(),
            "Engine created"
        );

        let ports = EnginePorts {
            mixer: Mixer::new(
                voice_rx,
                retired_tx,
                audio.channels(),
                samples.max_voices(),
            ),
            capture_input,
        };
        (engine, ports)
    }

    /// A pad was pressed: record into an empty slot or loop an occupied one.
    pub fn pad_pressed(&mut self, slot: SlotId) -> Result<GestureOutcome, EngineError> {
        self.session
            .press(slot, TriggerSource::Pad, &self.capture, &mut self.triggers)
    }

    /// A pad was released: finish the recording or stop the newest hold.
    pub fn pad_released(&mut self, slot: SlotId) -> Result<GestureOutcome, EngineError> {
        self.session
            .release(slot, TriggerSource::Pad, &self.capture, &mut self.triggers)
    }

    /// The delete control of a pad was pressed.
    pub fn pad_delete_pressed(&mut self, slot: SlotId) -> Result<GestureOutcome, EngineError> {
        self.session.delete(slot, &mut self.triggers)
    }

    /// A key was pressed. Keys loop occupied slots and ignore empty ones.
    pub fn key_pressed(&mut self, slot: SlotId) -> Result<GestureOutcome, EngineError> {
        self.session
            .press(slot, TriggerSource::Key, &self.capture, &mut self.triggers)
    }

    /// A key was released.
    pub fn key_released(&mut self, slot: SlotId) -> Result<GestureOutcome, EngineError> {
        self.session
            .release(slot, TriggerSource::Key, &self.capture, &mut self.triggers)
    }

    /// Starts the pattern from step zero.
    pub fn start(&mut self, now: Duration) {
        self.clock.start(now);
    }

    /// Stops the pattern. Sounding one-shots ring out.
    pub fn stop(&mut self) {
        self.clock.stop();
    }

    /// Sets the tempo and returns the tempo in effect after clamping.
    pub fn set_bpm(&mut self, bpm: f64) -> f64 {
        self.clock.set_bpm(bpm)
    }

    /// Moves the tempo by `increments` configured increments.
    pub fn adjust_bpm(&mut self, increments: i32) -> f64 {
        self.clock
            .adjust_bpm(f64::from(increments) * self.bpm_increment)
    }

    /// Flips a pattern cell. The change is heard the next time its column fires.
    pub fn toggle_step(&mut self, row: usize, column: usize) -> Result<bool, EngineError> {
        let active = self.pattern.toggle(row, column)?;
        debug!(row, column, active, "Step toggled");
        Ok(active)
    }

    /// Sets a pattern cell.
    pub fn set_step(&mut self, row: usize, column: usize, active: bool) -> Result<(), EngineError> {
        self.pattern.set(row, column, active)
    }

    /// Clears every pattern cell.
    pub fn clear_pattern(&mut self) {
        self.pattern.clear();
        info!("Pattern cleared");
    }

    /// Advances the clock to `now`, triggering every row set in each column
    /// that fires. Returns the fired columns in order.
    pub fn poll(&mut self, now: Duration) -> Vec<usize> {
        self.drop_retired();
        self.triggers.prune();
        let fired = self.clock.poll(now);
        for &column in &fired {
            for row in self.pattern.active_rows(column) {
                let slot = SlotId(row as u16);
                if let Err(e) = self.triggers.trigger(slot, PlayMode::OneShot) {
                    warn!(row, column, error = %e, "Step trigger failed");
                }
            }
        }
        fired
    }

    /// Installs a buffer into an idle slot, stopping voices of the old buffer.
    pub fn load_slot(
        &mut self,
        slot: SlotId,
        buffer: SampleBuffer,
    ) -> Result<Option<SampleBuffer>, EngineError> {
        self.session.prune_holds(slot, &self.triggers)?;
        self.session.require_idle(slot, "load")?;
        self.triggers.install(slot, buffer)
    }

    /// Stops the clock, every voice and any open capture.
    pub fn shutdown(&mut self) {
        self.clock.stop();
        self.session.reset(&mut self.triggers);
        self.triggers.stop_everything();
        self.drop_retired();
    }

    fn drop_retired(&mut self) {
        let dropped = self.retired.try_iter().count();
        if dropped > 0 {
            debug!(dropped, "Dropped retired voices");
        }
    }

    /// Returns the column that fires next.
    pub fn current_step(&self) -> usize {
        self.clock.current_step()
    }

    /// Returns the tempo.
    pub fn bpm(&self) -> f64 {
        self.clock.bpm()
    }

    /// Returns true while the pattern is playing.
    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Returns the time left before the next step, or None while stopped.
    pub fn time_until_next(&self, now: Duration) -> Option<Duration> {
        self.clock.time_until_next(now)
    }

    /// Returns the slot's status.
    pub fn slot_status(&self, slot: SlotId) -> Result<SlotStatus, EngineError> {
        self.session.status(slot, &self.triggers)
    }

    /// Returns true if any voice of the slot is playing, including pattern hits.
    pub fn is_slot_playing(&self, slot: SlotId) -> bool {
        self.triggers.is_sounding(slot)
    }

    /// Returns the slot's buffer, if any.
    pub fn slot_buffer(&self, slot: SlotId) -> Result<Option<&SampleBuffer>, EngineError> {
        self.triggers.buffer(slot)
    }

    /// Returns true while a capture is open.
    pub fn is_capturing(&self) -> bool {
        self.capture.is_active()
    }

    /// Returns whether a pattern cell is set.
    pub fn is_step_active(&self, row: usize, column: usize) -> Result<bool, EngineError> {
        self.pattern.is_active(row, column)
    }

    /// Returns the pattern.
    pub fn pattern(&self) -> &PatternMatrix {
        &self.pattern
    }

    /// Returns the instrument names, one per row.
    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    /// Returns the number of slots.
    pub fn slot_count(&self) -> usize {
        self.triggers.slot_count()
    }

    /// Returns the number of sounding voices.
    pub fn active_voice_count(&self) -> usize {
        self.triggers.active_voice_count()
    }

    /// Returns the sample rate of engine buffers.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("triggers", &self.triggers)
            .field("session", &self.session)
            .field("bpm", &self.clock.bpm())
            .field("running", &self.clock.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> (Engine, EnginePorts) {
        Engine::new(&EngineConfig::default())
    }

    #[test]
    fn test_defaults() {
        let (engine, ports) = engine();

        assert_eq!(engine.slot_count(), 16);
        assert_eq!(engine.instruments().len(), 4);
        assert_eq!(engine.pattern().steps(), 16);
        assert_eq!(engine.bpm(), 120.0);
        assert!(!engine.is_running());
        assert!(!ports.capture_input.is_active());
    }

    #[test]
    fn test_adjust_bpm_uses_increment() {
        let (mut engine, _ports) = engine();

        assert_eq!(engine.adjust_bpm(1), 125.0);
        assert_eq!(engine.adjust_bpm(-3), 110.0);
        assert_eq!(engine.adjust_bpm(100), 300.0);
        assert_eq!(engine.set_bpm(10.0), 30.0);
    }

    #[test]
    fn test_poll_triggers_one_shots() {
        let (mut engine, mut ports) = engine();
        engine
            .load_slot(SlotId(1), SampleBuffer::new(vec![1000; 4], 44100))
            .unwrap();
        engine.toggle_step(1, 0).unwrap();
        engine.start(Duration::ZERO);

        assert_eq!(engine.poll(Duration::from_millis(125)), vec![0]);
        assert!(engine.is_slot_playing(SlotId(1)));

        // The mixer plays the one-shot to its end.
        let mut out = [0.0f32; 8];
        ports.mixer.render(&mut out);
        assert!(out[..4].iter().all(|&s| s > 0.0));
        assert!(out[4..].iter().all(|&s| s == 0.0));
        engine.poll(Duration::from_millis(130));
        assert!(!engine.is_slot_playing(SlotId(1)));
    }

    #[test]
    fn test_finished_voice_is_freed_on_poll() {
        let (mut engine, mut ports) = engine();
        engine
            .load_slot(SlotId(0), SampleBuffer::new(vec![100; 4], 44100))
            .unwrap();
        engine.toggle_step(0, 0).unwrap();
        engine.start(Duration::ZERO);
        engine.poll(Duration::from_millis(125));

        let mut out = [0.0f32; 8];
        ports.mixer.render(&mut out);
        assert_eq!(ports.mixer.active_voices(), 0);

        // The mixer is done, but the voice's buffer is released by the control side.
        let buffer = engine.slot_buffer(SlotId(0)).unwrap().unwrap().clone();
        assert_eq!(buffer.reference_count(), 3);
        engine.poll(Duration::from_millis(126));
        assert_eq!(buffer.reference_count(), 2);
    }

    #[test]
    fn test_row_on_empty_slot_is_silent() {
        let (mut engine, ports) = engine();
        engine.toggle_step(2, 0).unwrap();
        engine.start(Duration::ZERO);

        assert_eq!(engine.poll(Duration::from_millis(125)), vec![0]);
        assert_eq!(engine.active_voice_count(), 0);
        drop(ports);
    }

    #[test]
    fn test_load_slot_rejected_while_recording() {
        let (mut engine, _ports) = engine();
        engine.pad_pressed(SlotId(0)).unwrap();

        assert_eq!(
            engine.load_slot(SlotId(0), SampleBuffer::new(vec![1], 44100)),
            Err(EngineError::InvalidGesture {
                slot: SlotId(0),
                gesture: "load",
                state: "recording"
            })
        );
    }

    #[test]
    fn test_shutdown() {
        let (mut engine, _ports) = engine();
        engine
            .load_slot(SlotId(0), SampleBuffer::new(vec![1], 44100))
            .unwrap();
        engine.pad_pressed(SlotId(0)).unwrap();
        engine.pad_pressed(SlotId(1)).unwrap();
        engine.start(Duration::ZERO);

        engine.shutdown();

        assert!(!engine.is_running());
        assert!(!engine.is_capturing());
        assert_eq!(engine.slot_status(SlotId(0)), Ok(SlotStatus::Occupied));
        assert_eq!(engine.active_voice_count(), 0);
    }
}
