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
use std::path::PathBuf;

use serde::Deserialize;

use crate::note;
use crate::samples::catalog::DEFAULT_EXTENSION;
use crate::samples::policy::{DEFAULT_MAX_SHIFT, DEFAULT_WIDE_MAX_SHIFT};

/// Where the recorded samples live.
#[derive(Deserialize, Clone, Debug)]
pub struct Samples {
    /// Directory holding `{ClassToken}{Octave}v10.{extension}` files.
    path: PathBuf,

    /// File extension of the samples (default: mp3).
    extension: Option<String>,
}

impl Samples {
    pub fn new(path: PathBuf) -> Samples {
        Samples {
            path,
            extension: None,
        }
    }

    /// Overrides the sample file extension.
    pub fn with_extension(self, extension: &str) -> Samples {
        Samples {
            extension: Some(extension.to_string()),
            ..self
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn extension(&self) -> &str {
        self.extension.as_deref().unwrap_or(DEFAULT_EXTENSION)
    }
}

/// Equal-tempered tuning reference.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Tuning {
    /// Pitch index of the reference note (default: 69, A4).
    reference_pitch: Option<i32>,

    /// Frequency of the reference note in Hz (default: 440).
    reference_frequency: Option<f64>,
}

impl Tuning {
    pub fn reference_pitch(&self) -> i32 {
        self.reference_pitch.unwrap_or(note::DEFAULT_REFERENCE_PITCH)
    }

    pub fn reference_frequency(&self) -> f64 {
        self.reference_frequency
            .unwrap_or(note::DEFAULT_REFERENCE_FREQUENCY)
    }
}

/// Limits on how far a sample may be transposed.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PitchShift {
    /// Largest shift in semitones for most pitch classes (default: 4).
    max_semitones: Option<u32>,

    /// Largest shift for the pitch class with the widest mapping (default: 12).
    wide_max_semitones: Option<u32>,
}

impl PitchShift {
    pub fn max_semitones(&self) -> u32 {
        self.max_semitones.unwrap_or(DEFAULT_MAX_SHIFT)
    }

    pub fn wide_max_semitones(&self) -> u32 {
        self.wide_max_semitones.unwrap_or(DEFAULT_WIDE_MAX_SHIFT)
    }
}
