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
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::Normalizer;
use crate::audio::SampleBuffer;
use crate::error::EngineError;
use crate::samples::SlotId;

/// Global session ID counter.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// The open end of a capture, visible to the producer.
struct OpenCapture {
    id: u64,
    slot: SlotId,
    sender: Sender<Vec<f32>>,
}

/// State shared between the control context and the input callback.
struct Shared {
    /// The open capture, if any. Producers send while holding this lock so
    /// closing it guarantees no further frames are in flight.
    open: Mutex<Option<OpenCapture>>,
    /// Cheap check for the producer so it skips copying when nothing is open.
    active: AtomicBool,
}

impl Shared {
    /// Closes the capture with the given id. Returns false if it was not open.
    fn close(&self, id: u64) -> bool {
        let closed = {
            let mut open = self.open.lock();
            if !open.as_ref().is_some_and(|capture| capture.id == id) {
                return false;
            }
            self.active.store(false, Ordering::Release);
            open.take()
        };
        // The sender is dropped after the lock is released.
        drop(closed);
        true
    }
}

/// Producer handle handed to the input callback.
///
/// Appending while no capture is open silently drops the frames. While a
/// capture is open each append copies the period into one new chunk and sends
/// it under the capture lock. The control side only holds that lock to swap
/// the open capture in or out, so the callback never waits on normalization
/// or logging.
#[derive(Clone)]
pub struct CaptureInput {
    shared: Arc<Shared>,
}

impl CaptureInput {
    /// Returns true if a capture is currently open.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Appends mono frames to the open capture.
    pub fn append_frames(&self, frames: &[f32]) {
        if frames.is_empty() || !self.is_active() {
            return;
        }
        self.send(frames.to_vec());
    }

    /// Downmixes interleaved frames to mono and appends them to the open capture.
    pub fn append_interleaved(&self, data: &[f32], channels: usize) {
        if channels <= 1 {
            self.append_frames(data);
            return;
        }
        if data.is_empty() || !self.is_active() {
            return;
        }
        let scale = 1.0 / channels as f32;
        let mono = data
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect();
        self.send(mono);
    }

    fn send(&self, chunk: Vec<f32>) {
        let open = self.shared.open.lock();
        if let Some(capture) = open.as_ref() {
            // The receiver lives in the session, which closes this end before it
            // is dropped, so a send can only fail if the session was leaked.
            let _ = capture.sender.send(chunk);
        }
    }
}

/// An open capture. Consumed by [`CapturePipeline::end`]; dropping it abandons
/// the capture.
pub struct CaptureSession {
    id: u64,
    slot: SlotId,
    chunks: Receiver<Vec<f32>>,
    shared: Arc<Shared>,
}

impl CaptureSession {
    /// Returns the slot the capture is for.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Returns the session ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the number of chunks received so far.
    pub fn pending_chunks(&self) -> usize {
        self.chunks.len()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.shared.close(self.id) {
            debug!(slot = %self.slot, session = self.id, "Capture abandoned");
        }
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("pending_chunks", &self.chunks.len())
            .finish()
    }
}

/// Owns the capture lifecycle on the control context.
pub struct CapturePipeline {
    shared: Arc<Shared>,
    normalizer: Normalizer,
}

impl CapturePipeline {
    /// Creates the pipeline and the producer handle for the input callback.
    pub fn new(normalizer: Normalizer) -> (CapturePipeline, CaptureInput) {
        let shared = Arc::new(Shared {
            open: Mutex::new(None),
            active: AtomicBool::new(false),
        });
        let input = CaptureInput {
            shared: shared.clone(),
        };
        (CapturePipeline { shared, normalizer }, input)
    }

    /// Returns true if a capture is open.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Returns the slot of the open capture, if any.
    pub fn active_slot(&self) -> Option<SlotId> {
        self.shared.open.lock().as_ref().map(|capture| capture.slot)
    }

    /// Opens a capture for the slot. Fails without touching the open capture if
    /// one already exists.
    pub fn begin(&self, slot: SlotId) -> Result<CaptureSession, EngineError> {
        // Unbounded: an open capture keeps accumulating until it is ended.
        let (sender, chunks) = crossbeam_channel::unbounded();
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);

        let mut open = self.shared.open.lock();
        let active = open.as_ref().map(|capture| capture.slot);
        if let Some(active) = active {
            drop(open);
            warn!(
                slot = %slot,
                active = %active,
                "Capture requested while another is active"
            );
            return Err(EngineError::CaptureAlreadyActive { active });
        }
        *open = Some(OpenCapture { id, slot, sender });
        self.shared.active.store(true, Ordering::Release);
        drop(open);
        info!(slot = %slot, session = id, "Capture started");

        Ok(CaptureSession {
            id,
            slot,
            chunks,
            shared: self.shared.clone(),
        })
    }

    /// Closes the session, then drains and normalizes everything it received.
    pub fn end(&self, session: CaptureSession) -> Result<SampleBuffer, EngineError> {
        // Close first: once the sender is gone no producer can add frames, so
        // the drain below sees the complete capture.
        self.shared.close(session.id);
        let chunks: Vec<Vec<f32>> = session.chunks.try_iter().collect();
        let frames: usize = chunks.iter().map(Vec::len).sum();
        info!(
            slot = %session.slot,
            session = session.id,
            chunks = chunks.len(),
            frames,
            "Capture ended"
        );
        self.normalizer.normalize(&chunks)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::testutil::eventually;

    fn pipeline() -> (CapturePipeline, CaptureInput) {
        CapturePipeline::new(Normalizer::new(1000, 44100))
    }

    #[test]
    fn test_capture_round() {
        let (pipeline, input) = pipeline();
        let session = pipeline.begin(SlotId(3)).unwrap();

        assert!(input.is_active());
        input.append_frames(&[0.1, 0.2]);
        input.append_frames(&[-0.4]);
        input.append_frames(&[0.2]);
        assert_eq!(session.pending_chunks(), 3);

        let buffer = pipeline.end(session).unwrap();
        assert_eq!(buffer.samples(), &[250, 500, -1000, 500]);
        assert!(!pipeline.is_active());
        assert!(!input.is_active());
    }

    #[test]
    fn test_frames_without_capture_are_dropped() {
        let (pipeline, input) = pipeline();
        input.append_frames(&[1.0, 1.0]);

        let session = pipeline.begin(SlotId(0)).unwrap();
        input.append_frames(&[0.5]);
        let buffer = pipeline.end(session).unwrap();

        assert_eq!(buffer.samples(), &[1000]);
    }

    #[test]
    fn test_begin_while_active() {
        let (pipeline, input) = pipeline();
        let session = pipeline.begin(SlotId(1)).unwrap();
        input.append_frames(&[0.3]);

        assert_eq!(
            pipeline.begin(SlotId(2)).unwrap_err(),
            EngineError::CaptureAlreadyActive { active: SlotId(1) }
        );
        assert_eq!(pipeline.active_slot(), Some(SlotId(1)));
        assert!(input.is_active());

        input.append_frames(&[-0.6]);
        assert_eq!(session.pending_chunks(), 2);
        let buffer = pipeline.end(session).unwrap();
        assert_eq!(buffer.samples(), &[500, -1000]);
    }

    #[test]
    fn test_silent_capture() {
        let (pipeline, input) = pipeline();
        let session = pipeline.begin(SlotId(0)).unwrap();
        input.append_frames(&[0.0; 128]);

        assert_eq!(pipeline.end(session).unwrap_err(), EngineError::EmptyCapture);
        assert!(!pipeline.is_active());
    }

    #[test]
    fn test_no_frames_is_empty_capture() {
        let (pipeline, _input) = pipeline();
        let session = pipeline.begin(SlotId(0)).unwrap();

        assert_eq!(pipeline.end(session).unwrap_err(), EngineError::EmptyCapture);
    }

    #[test]
    fn test_dropped_session_closes_capture() {
        let (pipeline, input) = pipeline();
        let session = pipeline.begin(SlotId(0)).unwrap();
        drop(session);

        assert!(!input.is_active());
        assert!(pipeline.begin(SlotId(0)).is_ok());
    }

    #[test]
    fn test_interleaved_downmix() {
        let (pipeline, input) = pipeline();
        let session = pipeline.begin(SlotId(0)).unwrap();
        input.append_interleaved(&[0.2, 0.4, -1.0, 0.0], 2);

        let buffer = pipeline.end(session).unwrap();
        assert_eq!(buffer.samples(), &[600, -1000]);
    }

    #[test]
    fn test_end_never_races_producer() {
        let (pipeline, input) = pipeline();
        let session = pipeline.begin(SlotId(5)).unwrap();

        let producer = {
            let input = input.clone();
            thread::spawn(move || {
                let mut sent = 0usize;
                // Keep producing until the capture closes underneath us.
                loop {
                    let active = input.is_active();
                    input.append_frames(&[0.5; 32]);
                    if !active {
                        return sent;
                    }
                    sent += 1;
                }
            })
        };

        eventually(
            || session.pending_chunks() >= 10,
            "Producer never delivered frames",
        );
        let buffer = pipeline.end(session).unwrap();
        let sent = producer.join().unwrap();

        // Every frame is either fully in the buffer or was dropped after close.
        assert_eq!(buffer.len() % 32, 0);
        assert!(buffer.len() / 32 <= sent);
        assert!(buffer.len() / 32 >= 10);
        assert!(buffer.samples().iter().all(|&s| s == 1000));
    }
}
