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
use std::path::Path;

use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::info;

use crate::sequencer::MIN_STEP_INTERVAL;

pub mod audio;
pub mod control;
mod error;
pub mod samples;
pub mod sequencer;

pub use error::ConfigError;

/// The complete engine configuration. Every section is optional.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct EngineConfig {
    #[serde(default)]
    audio: audio::Audio,
    #[serde(default)]
    sequencer: sequencer::Sequencer,
    #[serde(default)]
    samples: samples::Samples,
    #[serde(default)]
    control: control::Control,
}

impl EngineConfig {
    /// Loads and validates the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parses and validates the configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values make sense together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        let seq = &self.sequencer;

        if self.audio.channels() != 1 {
            return invalid(format!(
                "only mono buffers are supported, got {} channels",
                self.audio.channels()
            ));
        }
        if self.audio.sample_rate() == 0 {
            return invalid("sample_rate must be nonzero".to_string());
        }
        if self.audio.full_scale() <= 0 {
            return invalid(format!(
                "full_scale must be positive, got {}",
                self.audio.full_scale()
            ));
        }
        if seq.rows() == 0 {
            return invalid("at least one instrument is required".to_string());
        }
        if seq.steps() == 0 || seq.steps_per_beat() == 0 {
            return invalid("steps and steps_per_beat must be nonzero".to_string());
        }
        if !(seq.min_bpm() > 0.0 && seq.min_bpm() <= seq.max_bpm() && seq.max_bpm().is_finite()) {
            return invalid(format!(
                "bpm range {}..={} is invalid",
                seq.min_bpm(),
                seq.max_bpm()
            ));
        }
        if !(seq.min_bpm()..=seq.max_bpm()).contains(&seq.bpm()) {
            return invalid(format!(
                "bpm {} is outside {}..={}",
                seq.bpm(),
                seq.min_bpm(),
                seq.max_bpm()
            ));
        }
        if 60.0 / (seq.max_bpm() * f64::from(seq.steps_per_beat()))
            < MIN_STEP_INTERVAL.as_secs_f64()
        {
            return invalid(format!(
                "max_bpm {} makes steps shorter than {:?}",
                seq.max_bpm(),
                MIN_STEP_INTERVAL
            ));
        }
        if !(seq.bpm_increment() > 0.0) {
            return invalid("bpm_increment must be positive".to_string());
        }
        if self.samples.max_voices() == 0 {
            return invalid("max_voices must be nonzero".to_string());
        }
        if seq.rows() > self.samples.slots() {
            return invalid(format!(
                "{} instruments do not fit into {} slots",
                seq.rows(),
                self.samples.slots()
            ));
        }
        if self.samples.slots() > u16::MAX as usize {
            return invalid(format!("too many slots: {}", self.samples.slots()));
        }
        Ok(())
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> &audio::Audio {
        &self.audio
    }

    /// Returns the sequencer configuration.
    pub fn sequencer(&self) -> &sequencer::Sequencer {
        &self.sequencer
    }

    /// Returns the sample playback configuration.
    pub fn samples(&self) -> &samples::Samples {
        &self.samples
    }

    /// Returns the control loop configuration.
    pub fn control(&self) -> &control::Control {
        &self.control
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::samples::RetriggerBehavior;
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        config.validate().unwrap();

        assert_eq!(config.audio().sample_rate(), 44100);
        assert_eq!(config.audio().full_scale(), 32767);
        assert_eq!(config.sequencer().rows(), 4);
        assert_eq!(config.sequencer().steps(), 16);
        assert_eq!(config.sequencer().bpm(), 120.0);
        assert_eq!(config.samples().slots(), 16);
        assert_eq!(config.control().tick().unwrap(), Duration::from_millis(5));
    }

    #[test]
    fn test_from_yaml_str() {
        let yaml = r#"
            audio:
              sample_rate: 48000
              full_scale: 16000
            sequencer:
              instruments: [Kick, Snare]
              steps: 8
              bpm: 90
            samples:
              slots: 4
              retrigger: cut
            control:
              tick: 2ms
        "#;

        let config = EngineConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.audio().sample_rate(), 48000);
        assert_eq!(config.audio().full_scale(), 16000);
        assert_eq!(config.sequencer().instruments(), vec!["Kick", "Snare"]);
        assert_eq!(config.sequencer().steps(), 8);
        assert_eq!(config.sequencer().bpm(), 90.0);
        assert_eq!(config.samples().slots(), 4);
        assert_eq!(config.samples().retrigger(), RetriggerBehavior::Cut);
        assert_eq!(config.control().tick().unwrap(), Duration::from_millis(2));
    }

    #[test]
    fn test_rejects_out_of_range_bpm() {
        let yaml = r#"
            sequencer:
              bpm: 400
        "#;

        assert!(matches!(
            EngineConfig::from_yaml_str(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_tempo_faster_than_the_clock() {
        let yaml = r#"
            sequencer:
              bpm: 100000.0
              max_bpm: 100000.0
        "#;

        assert!(matches!(
            EngineConfig::from_yaml_str(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_accepts_fast_tempo_above_the_floor() {
        // 60 / (12000 * 4) = 1.25ms per step.
        let yaml = r#"
            sequencer:
              bpm: 12000
              max_bpm: 12000
        "#;

        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.sequencer().max_bpm(), 12000.0);
    }

    #[test]
    fn test_rejects_stereo() {
        let yaml = r#"
            audio:
              channels: 2
        "#;

        assert!(matches!(
            EngineConfig::from_yaml_str(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_more_instruments_than_slots() {
        let yaml = r#"
            sequencer:
              instruments: [a, b, c]
            samples:
              slots: 2
        "#;

        assert!(matches!(
            EngineConfig::from_yaml_str(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "sequencer:\n  steps: 32\n  min_bpm: 60").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();

        assert_eq!(config.sequencer().steps(), 32);
        assert_eq!(config.sequencer().min_bpm(), 60.0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineConfig::load(&dir.path().join("missing.yaml"));

        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
