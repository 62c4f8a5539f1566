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
use serde::Deserialize;

pub const DEFAULT_STEPS: usize = 16;
pub const DEFAULT_STEPS_PER_BEAT: u32 = 4;
pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_MIN_BPM: f64 = 30.0;
pub const DEFAULT_MAX_BPM: f64 = 300.0;
pub const DEFAULT_BPM_INCREMENT: f64 = 5.0;

/// Instruments of the built-in drum kit, one per row.
pub const DEFAULT_INSTRUMENTS: [&str; 4] = ["Kick", "Snare", "HiHat", "Clap"];

/// A YAML representation of the step sequencer configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Sequencer {
    /// Instrument names, one per pattern row.
    instruments: Option<Vec<String>>,

    /// Number of steps per row (default: 16).
    steps: Option<usize>,

    /// Steps per quarter-note beat (default: 4, sixteenth notes).
    steps_per_beat: Option<u32>,

    /// Initial tempo (default: 120).
    bpm: Option<f64>,

    /// Lowest accepted tempo (default: 30).
    min_bpm: Option<f64>,

    /// Highest accepted tempo (default: 300).
    max_bpm: Option<f64>,

    /// Tempo change applied by a single nudge (default: 5).
    bpm_increment: Option<f64>,
}

impl Sequencer {
    /// Returns the instrument names, one per row.
    pub fn instruments(&self) -> Vec<String> {
        match &self.instruments {
            Some(instruments) => instruments.clone(),
            None => DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Returns the number of rows.
    pub fn rows(&self) -> usize {
        self.instruments
            .as_ref()
            .map_or(DEFAULT_INSTRUMENTS.len(), Vec::len)
    }

    /// Returns the number of steps per row.
    pub fn steps(&self) -> usize {
        self.steps.unwrap_or(DEFAULT_STEPS)
    }

    /// Returns the steps per beat.
    pub fn steps_per_beat(&self) -> u32 {
        self.steps_per_beat.unwrap_or(DEFAULT_STEPS_PER_BEAT)
    }

    /// Returns the initial tempo.
    pub fn bpm(&self) -> f64 {
        self.bpm.unwrap_or(DEFAULT_BPM)
    }

    /// Returns the lowest accepted tempo.
    pub fn min_bpm(&self) -> f64 {
        self.min_bpm.unwrap_or(DEFAULT_MIN_BPM)
    }

    /// Returns the highest accepted tempo.
    pub fn max_bpm(&self) -> f64 {
        self.max_bpm.unwrap_or(DEFAULT_MAX_BPM)
    }

    /// Returns the tempo nudge increment.
    pub fn bpm_increment(&self) -> f64 {
        self.bpm_increment.unwrap_or(DEFAULT_BPM_INCREMENT)
    }
}
