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
use serde::{Deserialize, Serialize};

/// Default number of slots in the registry.
pub const DEFAULT_SLOTS: usize = 16;

/// Default maximum number of concurrent sample voices globally.
pub const DEFAULT_MAX_SAMPLE_VOICES: usize = 32;

/// Behavior when a slot is triggered while a previous voice is still sounding.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetriggerBehavior {
    /// Stop the previous voice(s) and start a new one.
    Cut,
    /// Allow multiple voices to play simultaneously.
    #[default]
    Polyphonic,
}

/// A YAML representation of the sample playback configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Samples {
    /// Number of slots shared by pads, keys and sequencer rows (default: 16).
    slots: Option<usize>,

    /// Maximum concurrent voices across all slots (default: 32).
    max_voices: Option<usize>,

    /// Retrigger policy (default: polyphonic).
    #[serde(default)]
    retrigger: RetriggerBehavior,
}

impl Samples {
    /// Returns the number of slots.
    pub fn slots(&self) -> usize {
        self.slots.unwrap_or(DEFAULT_SLOTS)
    }

    /// Returns the global voice limit.
    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_SAMPLE_VOICES)
    }

    /// Returns the retrigger policy.
    pub fn retrigger(&self) -> RetriggerBehavior {
        self.retrigger
    }
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    #[test]
    fn test_samples_defaults() {
        let samples = Samples::default();

        assert_eq!(samples.slots(), DEFAULT_SLOTS);
        assert_eq!(samples.max_voices(), DEFAULT_MAX_SAMPLE_VOICES);
        assert_eq!(samples.retrigger(), RetriggerBehavior::Polyphonic);
    }

    #[test]
    fn test_samples_deserialize() {
        let yaml = r#"
            slots: 8
            max_voices: 4
            retrigger: cut
        "#;

        let samples: Samples = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(samples.slots(), 8);
        assert_eq!(samples.max_voices(), 4);
        assert_eq!(samples.retrigger(), RetriggerBehavior::Cut);
    }
}
