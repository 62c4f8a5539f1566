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

// Voice mixing for the output callback. Nothing in here allocates or frees
// once the scratch buffer has grown to the callback's period size: finished
// voices go back to the control side, which drops them and their buffers.
use crate::samples::{Voice, VoiceReceiver, VoiceSender};

/// Scratch frames reserved up front so typical periods never reallocate.
const DEFAULT_SCRATCH_FRAMES: usize = 4096;

/// Mixes every sounding voice into the output buffer.
pub struct Mixer {
    /// Voices currently being mixed.
    voices: Vec<Voice>,
    /// New voices from the trigger engine.
    voice_rx: VoiceReceiver,
    /// Finished voices, returned to the control side to be dropped.
    retired_tx: VoiceSender,
    /// Number of interleaved output channels.
    channels: usize,
    /// Mono mix for the current period.
    scratch: Vec<f32>,
}

impl Mixer {
    /// Creates a mixer writing to `channels` interleaved output channels.
    ///
    /// `retired_tx` should be bounded so sending never allocates. If it is full
    /// or disconnected, a finished voice is dropped in the callback instead.
    pub fn new(
        voice_rx: VoiceReceiver,
        retired_tx: VoiceSender,
        channels: u16,
        max_voices: usize,
    ) -> Self {
        Self {
            voices: Vec::with_capacity(max_voices),
            voice_rx,
            retired_tx,
            channels: usize::from(channels.max(1)),
            scratch: Vec::with_capacity(DEFAULT_SCRATCH_FRAMES),
        }
    }

    /// Gets the number of output channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sets the number of output channels once the device is known.
    pub fn set_channels(&mut self, channels: u16) {
        self.channels = usize::from(channels.max(1));
    }

    /// Returns the number of voices still being mixed.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Renders one period into interleaved `out`.
    ///
    /// Voices sum in mono and the clamped mix is copied to every channel.
    /// Voices that were stopped or ran out are marked finished and handed back
    /// on the retired channel.
    pub fn render(&mut self, out: &mut [f32]) {
        while let Ok(voice) = self.voice_rx.try_recv() {
            self.voices.push(voice);
        }

        let frames = out.len() / self.channels;
        self.scratch.clear();
        self.scratch.resize(frames, 0.0);

        let scratch = &mut self.scratch;
        let mut index = 0;
        while index < self.voices.len() {
            if self.voices[index].mix_into(&mut scratch[..]) {
                index += 1;
                continue;
            }
            let voice = self.voices.swap_remove(index);
            voice.state().finish();
            let _ = self.retired_tx.try_send(voice);
        }

        for (frame, sample) in out.chunks_exact_mut(self.channels).zip(&self.scratch) {
            frame.fill(sample.clamp(-1.0, 1.0));
        }
        // A trailing partial frame gets silence.
        let rendered = frames * self.channels;
        out[rendered..].fill(0.0);
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("voices", &self.voices.len())
            .field("channels", &self.channels)
            .finish()
    }
}
