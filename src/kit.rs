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

//! Built-in sounds: a four piece drum kit for the sequencer rows and one octave
//! of sine tones for key slots.

use std::f64::consts::PI;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::audio::SampleBuffer;
use crate::samples::SlotId;

const FULL_SCALE: f64 = i16::MAX as f64;

/// Length of the moving average removed from the hi-hat noise.
const HIHAT_SMOOTHING_TAPS: usize = 30;

/// Length of a key tone.
pub const TONE_DURATION: Duration = Duration::from_millis(500);

/// One octave from middle C, as (name, MIDI note).
pub const OCTAVE: [(&str, u8); 12] = [
    ("C4", 60),
    ("C#4", 61),
    ("D4", 62),
    ("D#4", 63),
    ("E4", 64),
    ("F4", 65),
    ("F#4", 66),
    ("G4", 67),
    ("G#4", 68),
    ("A4", 69),
    ("A#4", 70),
    ("B4", 71),
];

/// A synthesized drum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Drum {
    Kick,
    Snare,
    HiHat,
    Clap,
}

impl Drum {
    /// Returns the drum's name.
    pub fn name(self) -> &'static str {
        match self {
            Drum::Kick => "Kick",
            Drum::Snare => "Snare",
            Drum::HiHat => "HiHat",
            Drum::Clap => "Clap",
        }
    }

    /// Returns how long the drum rings.
    pub fn duration(self) -> Duration {
        match self {
            Drum::Kick => Duration::from_millis(500),
            Drum::Snare => Duration::from_millis(300),
            Drum::HiHat => Duration::from_millis(100),
            Drum::Clap => Duration::from_millis(200),
        }
    }

    /// Synthesizes the drum at the given sample rate.
    pub fn render<R: Rng>(self, sample_rate: u32, rng: &mut R) -> SampleBuffer {
        let frames = frame_count(self.duration(), sample_rate);
        let rate = sample_rate as f64;
        let samples = match self {
            Drum::Kick => {
                // Pitch falls linearly from 150 Hz to 60 Hz.
                let last = frames.saturating_sub(1).max(1) as f64;
                (0..frames)
                    .map(|i| {
                        let t = i as f64 / rate;
                        let freq = 150.0 - 90.0 * i as f64 / last;
                        (2.0 * PI * freq * t).sin() * (-8.0 * t).exp()
                    })
                    .collect()
            }
            Drum::Snare => decaying_noise(frames, rate, 20.0, rng),
            Drum::Clap => decaying_noise(frames, rate, 15.0, rng),
            Drum::HiHat => {
                let noise = noise(frames, rng);
                high_pass(&noise)
                    .into_iter()
                    .enumerate()
                    .map(|(i, s)| s * (-30.0 * i as f64 / rate).exp())
                    .collect()
            }
        };
        SampleBuffer::new(quantize(&samples), sample_rate)
    }
}

impl FromStr for Drum {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kick" => Ok(Drum::Kick),
            "snare" => Ok(Drum::Snare),
            "hihat" | "hi-hat" | "hat" => Ok(Drum::HiHat),
            "clap" => Ok(Drum::Clap),
            _ => Err(format!("unknown drum {}", s)),
        }
    }
}

fn frame_count(duration: Duration, sample_rate: u32) -> usize {
    (sample_rate as f64 * duration.as_secs_f64()) as usize
}

fn noise<R: Rng>(frames: usize, rng: &mut R) -> Vec<f64> {
    (0..frames).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn decaying_noise<R: Rng>(frames: usize, rate: f64, decay: f64, rng: &mut R) -> Vec<f64> {
    noise(frames, rng)
        .into_iter()
        .enumerate()
        .map(|(i, s)| s * (-decay * i as f64 / rate).exp())
        .collect()
}

/// Subtracts a centered moving average, leaving the high frequencies.
fn high_pass(signal: &[f64]) -> Vec<f64> {
    let before = HIHAT_SMOOTHING_TAPS / 2;
    let after = HIHAT_SMOOTHING_TAPS - before - 1;
    (0..signal.len())
        .map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after + 1).min(signal.len());
            let sum: f64 = signal[start..end].iter().sum();
            signal[i] - sum / HIHAT_SMOOTHING_TAPS as f64
        })
        .collect()
}

fn quantize(samples: &[f64]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s * FULL_SCALE).clamp(-FULL_SCALE, FULL_SCALE) as i16)
        .collect()
}

/// Returns the frequency of a MIDI note in Hz.
pub fn note_frequency(note: u8) -> f64 {
    440.0 * 2f64.powf((note as f64 - 69.0) / 12.0)
}

/// Renders a full scale sine tone for a MIDI note.
pub fn tone(note: u8, sample_rate: u32) -> SampleBuffer {
    let frames = frame_count(TONE_DURATION, sample_rate);
    let freq = note_frequency(note);
    let samples: Vec<f64> = (0..frames)
        .map(|i| (2.0 * PI * freq * i as f64 / sample_rate as f64).sin())
        .collect();
    SampleBuffer::new(quantize(&samples), sample_rate)
}

/// Renders the drum for each instrument row. Rows with unknown names stay empty.
pub fn drum_kit<R: Rng>(
    instruments: &[String],
    sample_rate: u32,
    rng: &mut R,
) -> Vec<(SlotId, SampleBuffer)> {
    let mut kit = Vec::with_capacity(instruments.len());
    for (row, name) in instruments.iter().enumerate() {
        let Ok(slot) = u16::try_from(row).map(SlotId) else {
            break;
        };
        match name.parse::<Drum>() {
            Ok(drum) => {
                kit.push((slot, drum.render(sample_rate, rng)));
            }
            Err(e) => warn!(row, error = %e, "No built-in sound for instrument"),
        }
    }
    info!(loaded = kit.len(), rows = instruments.len(), "Drum kit rendered");
    kit
}

/// Renders one octave of tones for the first twelve slots.
pub fn piano(sample_rate: u32) -> Vec<(SlotId, SampleBuffer)> {
    OCTAVE
        .iter()
        .zip(0u16..)
        .map(|(&(_, note), slot)| (SlotId(slot), tone(note, sample_rate)))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::testutil::audio::calculate_rms;

    fn rms(samples: &[i16]) -> f32 {
        let floats: Vec<f32> = samples.iter().map(|&s| s as f32 / 32767.0).collect();
        calculate_rms(&floats)
    }

    #[test]
    fn test_drum_lengths() {
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(Drum::Kick.render(44100, &mut rng).len(), 22050);
        assert_eq!(Drum::Snare.render(44100, &mut rng).len(), 13230);
        assert_eq!(Drum::HiHat.render(44100, &mut rng).len(), 4410);
        assert_eq!(Drum::Clap.render(44100, &mut rng).len(), 8820);
    }

    #[test]
    fn test_kick_starts_at_zero_and_decays() {
        let mut rng = StdRng::seed_from_u64(1);
        let kick = Drum::Kick.render(44100, &mut rng);
        let samples = kick.samples();

        assert_eq!(samples[0], 0);
        let tenth = samples.len() / 10;
        assert!(rms(&samples[..tenth]) > 4.0 * rms(&samples[samples.len() - tenth..]));
    }

    #[test]
    fn test_noise_drums_decay() {
        let mut rng = StdRng::seed_from_u64(5);
        for drum in [Drum::Snare, Drum::HiHat, Drum::Clap] {
            let buffer = drum.render(44100, &mut rng);
            let samples = buffer.samples();
            let tenth = samples.len() / 10;
            assert!(
                rms(&samples[..tenth]) > rms(&samples[samples.len() - tenth..]),
                "{} did not decay",
                drum.name()
            );
        }
    }

    #[test]
    fn test_seeded_render_is_repeatable() {
        let a = Drum::Snare.render(8000, &mut StdRng::seed_from_u64(9));
        let b = Drum::Snare.render(8000, &mut StdRng::seed_from_u64(9));

        assert_eq!(a.samples(), b.samples());
    }

    #[test]
    fn test_high_pass_removes_dc() {
        let filtered = high_pass(&[0.5; 100]);

        // Away from the edges a constant signal cancels out.
        for s in &filtered[15..85] {
            assert!(s.abs() < 1e-12);
        }
    }

    #[test]
    fn test_drum_from_str() {
        assert_eq!("kick".parse::<Drum>(), Ok(Drum::Kick));
        assert_eq!("HiHat".parse::<Drum>(), Ok(Drum::HiHat));
        assert!("cowbell".parse::<Drum>().is_err());
    }

    #[test]
    fn test_drum_kit_skips_unknown_rows() {
        let instruments = vec!["Kick".to_string(), "Cowbell".to_string(), "Clap".to_string()];
        let kit = drum_kit(&instruments, 44100, &mut StdRng::seed_from_u64(2));

        let slots: Vec<SlotId> = kit.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, vec![SlotId(0), SlotId(2)]);
    }

    #[test]
    fn test_note_frequency() {
        assert!((note_frequency(69) - 440.0).abs() < 1e-9);
        assert!((note_frequency(60) - 261.625_565).abs() < 1e-3);
    }

    #[test]
    fn test_tone() {
        let buffer = tone(69, 44100);

        assert_eq!(buffer.len(), 22050);
        assert_eq!(buffer.duration(), TONE_DURATION);
        assert!(buffer.peak() >= 32700);
        assert_eq!(piano(44100).len(), 12);
    }
}
