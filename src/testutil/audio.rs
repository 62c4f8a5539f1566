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

use std::f32::consts::PI;

/// Generates a sine wave at the given amplitude.
pub fn sine(frequency: f32, amplitude: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Splits a signal into chunks the way an input callback delivers it.
pub fn chunked(signal: &[f32], chunk_frames: usize) -> Vec<Vec<f32>> {
    signal.chunks(chunk_frames).map(<[f32]>::to_vec).collect()
}

/// Interleaves a mono signal into `channels` identical channels.
pub fn interleave(signal: &[f32], channels: usize) -> Vec<f32> {
    signal
        .iter()
        .flat_map(|&s| std::iter::repeat(s).take(channels))
        .collect()
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
