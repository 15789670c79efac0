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
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use super::audio::Audio;
use super::error::ConfigError;
use super::samples::{PitchShift, Samples, Tuning};
use crate::note;
use crate::samples::policy::PitchShiftPolicy;
use crate::samples::voice::DEFAULT_RELEASE;

/// Highest MIDI pitch accepted as a tuning reference.
const MAX_PITCH: i32 = 127;

/// Largest accepted pitch-shift limit, in semitones.
const MAX_SHIFT: u32 = 12;

/// The top level YAML configuration of the note engine.
#[derive(Deserialize, Clone, Debug)]
pub struct Engine {
    /// The audio output.
    #[serde(default)]
    audio: Audio,

    /// The recorded samples.
    samples: Samples,

    #[serde(default)]
    tuning: Tuning,

    #[serde(default)]
    pitch_shift: PitchShift,

    /// Fade applied when a note is released (default: 100ms).
    release: Option<String>,

    /// Only accept note events on this MIDI channel (1-16). All channels when unset.
    midi_channel: Option<u8>,

    /// Directory of the file this configuration was read from.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Engine {
    /// Creates a configuration with every default.
    pub fn new(audio: Audio, samples: Samples) -> Engine {
        Engine {
            audio,
            samples,
            tuning: Tuning::default(),
            pitch_shift: PitchShift::default(),
            release: None,
            midi_channel: None,
            base_path: PathBuf::new(),
        }
    }

    /// Parse an engine configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Engine, ConfigError> {
        let mut engine = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Engine>()?;
        engine.base_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
        engine.validate()?;
        Ok(engine)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.release()?;
        self.midi_channel()?;
        if self.audio.sample_rate() == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audio.sample_rate",
                reason: "must be greater than 0".to_string(),
            });
        }
        let pitch = self.tuning.reference_pitch();
        if !(0..=MAX_PITCH).contains(&pitch) {
            return Err(ConfigError::InvalidValue {
                field: "tuning.reference_pitch",
                reason: format!("{} is outside 0-{}", pitch, MAX_PITCH),
            });
        }
        for (field, shift) in [
            ("pitch_shift.max_semitones", self.pitch_shift.max_semitones()),
            (
                "pitch_shift.wide_max_semitones",
                self.pitch_shift.wide_max_semitones(),
            ),
        ] {
            if shift > MAX_SHIFT {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{} is more than {} semitones", shift, MAX_SHIFT),
                });
            }
        }
        let frequency = self.tuning.reference_frequency();
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "tuning.reference_frequency",
                reason: format!("{} is not a positive frequency", frequency),
            });
        }
        Ok(())
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// The sample directory. Relative paths are resolved against the directory
    /// of the configuration file.
    pub fn sample_path(&self) -> PathBuf {
        if self.samples.path().is_absolute() {
            self.samples.path().clone()
        } else {
            self.base_path.join(self.samples.path())
        }
    }

    pub fn sample_extension(&self) -> &str {
        self.samples.extension()
    }

    pub fn tuning(&self) -> note::Tuning {
        note::Tuning::new(
            self.tuning.reference_pitch(),
            self.tuning.reference_frequency(),
        )
    }

    pub fn pitch_shift_policy(&self) -> PitchShiftPolicy {
        PitchShiftPolicy::new(
            self.pitch_shift.max_semitones(),
            self.pitch_shift.wide_max_semitones(),
        )
    }

    /// The release fade.
    pub fn release(&self) -> Result<Duration, ConfigError> {
        match &self.release {
            Some(release) => Ok(DurationString::from_string(release.clone())
                .map_err(|e| ConfigError::InvalidDuration(release.clone(), e.to_string()))?
                .into()),
            None => Ok(DEFAULT_RELEASE),
        }
    }

    /// The 0-indexed MIDI channel to listen on, if restricted.
    pub fn midi_channel(&self) -> Result<Option<u8>, ConfigError> {
        match self.midi_channel {
            Some(channel @ 1..=16) => Ok(Some(channel - 1)),
            Some(channel) => Err(ConfigError::InvalidValue {
                field: "midi_channel",
                reason: format!("{} is outside 1-16", channel),
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_config(yaml: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        fs::write(&path, yaml).unwrap();
        (dir, path)
    }

    #[test]
    fn test_minimal_config() {
        let (dir, path) = write_config(
            r#"
            samples:
              path: piano10
            "#,
        );
        let engine = Engine::deserialize(&path).unwrap();

        assert_eq!(engine.audio().device(), "default");
        assert_eq!(engine.audio().sample_rate(), 44100);
        assert_eq!(engine.sample_path(), dir.path().join("piano10"));
        assert_eq!(engine.sample_extension(), "mp3");
        assert_eq!(engine.tuning(), note::Tuning::default());
        assert_eq!(engine.pitch_shift_policy(), PitchShiftPolicy::default());
        assert_eq!(engine.release().unwrap(), Duration::from_millis(100));
        assert_eq!(engine.midi_channel().unwrap(), None);
    }

    #[test]
    fn test_full_config() {
        let (_dir, path) = write_config(
            r#"
            audio:
              device: mock-output
              sample_rate: 48000
            samples:
              path: /srv/piano
              extension: wav
            tuning:
              reference_pitch: 69
              reference_frequency: 432.0
            pitch_shift:
              max_semitones: 2
              wide_max_semitones: 6
            release: 250ms
            midi_channel: 10
            "#,
        );
        let engine = Engine::deserialize(&path).unwrap();

        assert_eq!(engine.audio().device(), "mock-output");
        assert_eq!(engine.audio().sample_rate(), 48000);
        assert_eq!(engine.sample_path(), PathBuf::from("/srv/piano"));
        assert_eq!(engine.sample_extension(), "wav");
        assert!((engine.tuning().frequency(69) - 432.0).abs() < 1e-9);
        assert_eq!(engine.pitch_shift_policy(), PitchShiftPolicy::new(2, 6));
        assert_eq!(engine.release().unwrap(), Duration::from_millis(250));
        assert_eq!(engine.midi_channel().unwrap(), Some(9));
    }

    #[test]
    fn test_invalid_values() {
        for yaml in [
            "samples:\n  path: x\nrelease: soon\n",
            "samples:\n  path: x\nmidi_channel: 17\n",
            "samples:\n  path: x\nmidi_channel: 0\n",
            "samples:\n  path: x\ntuning:\n  reference_frequency: -1.0\n",
            "samples:\n  path: x\ntuning:\n  reference_pitch: -2147483648\n",
            "samples:\n  path: x\ntuning:\n  reference_pitch: 128\n",
            "samples:\n  path: x\naudio:\n  sample_rate: 0\n",
            "samples:\n  path: x\npitch_shift:\n  max_semitones: 13\n",
            "samples:\n  path: x\npitch_shift:\n  wide_max_semitones: 40\n",
        ] {
            let (_dir, path) = write_config(yaml);
            assert!(Engine::deserialize(&path).is_err(), "accepted {yaml}");
        }
    }

    #[test]
    fn test_missing_samples_section() {
        let (_dir, path) = write_config("release: 100ms\n");
        assert!(matches!(
            Engine::deserialize(&path),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(Engine::deserialize(Path::new("/nonexistent/engine.yaml")).is_err());
    }
}
