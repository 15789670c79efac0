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

//! The static catalog of recorded piano samples.
//!
//! Only four pitch classes were recorded (C, D#, F#, A: a minor third apart), at
//! most one sample per class per octave. Files are named
//! `{ClassToken}{Octave}v{Velocity}.{ext}`, e.g. `Ds4v10.mp3`.

use std::fmt;
use std::str::FromStr;

use crate::note::{pitch_of, PitchClass, PitchIndex};

/// The single recorded dynamic level.
pub const SAMPLE_VELOCITY: u8 = 10;

/// Default extension of the sample assets.
pub const DEFAULT_EXTENSION: &str = "mp3";

/// Errors produced while parsing sample file names.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("invalid sample name: {0}")]
    InvalidName(String),

    #[error("{0} is not a recorded pitch class")]
    UnknownClass(String),

    #[error("octave {0} is outside 0-8")]
    OctaveOutOfRange(i32),

    #[error("velocity {0} was not recorded (only v{SAMPLE_VELOCITY})")]
    UnsupportedVelocity(u32),
}

/// The pitch classes that have recordings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CatalogClass {
    C,
    Ds,
    Fs,
    A,
}

impl CatalogClass {
    pub const ALL: [CatalogClass; 4] = [
        CatalogClass::C,
        CatalogClass::Ds,
        CatalogClass::Fs,
        CatalogClass::A,
    ];

    /// The filesystem-safe token used in file names.
    pub fn token(self) -> &'static str {
        match self {
            CatalogClass::C => "C",
            CatalogClass::Ds => "Ds",
            CatalogClass::Fs => "Fs",
            CatalogClass::A => "A",
        }
    }

    /// The symbolic pitch class of the recordings.
    pub fn pitch_class(self) -> PitchClass {
        match self {
            CatalogClass::C => PitchClass::C,
            CatalogClass::Ds => PitchClass::DSharp,
            CatalogClass::Fs => PitchClass::FSharp,
            CatalogClass::A => PitchClass::A,
        }
    }

    /// Gets the catalog class for a pitch class, if it was recorded.
    pub fn from_pitch_class(class: PitchClass) -> Option<CatalogClass> {
        Self::ALL.into_iter().find(|c| c.pitch_class() == class)
    }

    /// Parses a class token. Both `Ds` and `D#` spellings are accepted.
    pub fn from_token(token: &str) -> Result<CatalogClass, CatalogError> {
        let class: PitchClass = token
            .parse()
            .map_err(|_| CatalogError::UnknownClass(token.to_string()))?;
        Self::from_pitch_class(class).ok_or_else(|| CatalogError::UnknownClass(token.to_string()))
    }

    /// Position of this class in the catalog declaration order.
    fn declaration_rank(self) -> usize {
        match self {
            CatalogClass::A => 0,
            CatalogClass::C => 1,
            CatalogClass::Ds => 2,
            CatalogClass::Fs => 3,
        }
    }
}

/// Identifies one recorded sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleKey {
    class: CatalogClass,
    octave: i32,
}

impl SampleKey {
    /// Creates a new sample key.
    pub const fn new(class: CatalogClass, octave: i32) -> SampleKey {
        SampleKey { class, octave }
    }

    /// The recorded class.
    pub fn class(&self) -> CatalogClass {
        self.class
    }

    /// The recorded octave.
    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// The pitch the sample was recorded at.
    pub fn pitch(&self) -> PitchIndex {
        pitch_of(self.class.pitch_class(), self.octave)
    }

    /// The asset file name with the given extension.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self, extension)
    }

    /// Sort key matching the order of `CATALOG`.
    pub fn declaration_rank(&self) -> (usize, i32) {
        (self.class.declaration_rank(), self.octave)
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}v{}",
            self.class.token(),
            self.octave,
            SAMPLE_VELOCITY
        )
    }
}

impl FromStr for SampleKey {
    type Err = CatalogError;

    /// Parses `Ds4v10` or `Ds4v10.mp3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CatalogError::InvalidName(s.to_string());
        let stem = s.split('.').next().unwrap_or(s);

        let digits_at = stem.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
        let (token, rest) = stem.split_at(digits_at);
        let (octave, velocity) = rest.split_once('v').ok_or_else(invalid)?;

        let class = CatalogClass::from_token(token)?;
        let octave: i32 = octave.parse().map_err(|_| invalid())?;
        let velocity: u32 = velocity.parse().map_err(|_| invalid())?;

        if !(0..=8).contains(&octave) {
            return Err(CatalogError::OctaveOutOfRange(octave));
        }
        if velocity != SAMPLE_VELOCITY as u32 {
            return Err(CatalogError::UnsupportedVelocity(velocity));
        }

        Ok(SampleKey::new(class, octave))
    }
}

/// Every recorded sample, in declaration order.
pub static CATALOG: [SampleKey; 30] = [
    SampleKey::new(CatalogClass::A, 0),
    SampleKey::new(CatalogClass::A, 1),
    SampleKey::new(CatalogClass::A, 2),
    SampleKey::new(CatalogClass::A, 3),
    SampleKey::new(CatalogClass::A, 4),
    SampleKey::new(CatalogClass::A, 5),
    SampleKey::new(CatalogClass::A, 6),
    SampleKey::new(CatalogClass::A, 7),
    SampleKey::new(CatalogClass::C, 1),
    SampleKey::new(CatalogClass::C, 2),
    SampleKey::new(CatalogClass::C, 3),
    SampleKey::new(CatalogClass::C, 4),
    SampleKey::new(CatalogClass::C, 5),
    SampleKey::new(CatalogClass::C, 6),
    SampleKey::new(CatalogClass::C, 7),
    SampleKey::new(CatalogClass::C, 8),
    SampleKey::new(CatalogClass::Ds, 1),
    SampleKey::new(CatalogClass::Ds, 2),
    SampleKey::new(CatalogClass::Ds, 3),
    SampleKey::new(CatalogClass::Ds, 4),
    SampleKey::new(CatalogClass::Ds, 5),
    SampleKey::new(CatalogClass::Ds, 6),
    SampleKey::new(CatalogClass::Ds, 7),
    SampleKey::new(CatalogClass::Fs, 1),
    SampleKey::new(CatalogClass::Fs, 2),
    SampleKey::new(CatalogClass::Fs, 3),
    SampleKey::new(CatalogClass::Fs, 4),
    SampleKey::new(CatalogClass::Fs, 5),
    SampleKey::new(CatalogClass::Fs, 6),
    SampleKey::new(CatalogClass::Fs, 7),
];

/// Gets the catalog entry recorded exactly at the given pitch.
pub fn entry_at(pitch: PitchIndex) -> Option<SampleKey> {
    CATALOG.iter().copied().find(|key| key.pitch() == pitch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_shape() {
        let classes: HashSet<CatalogClass> = CATALOG.iter().map(|k| k.class()).collect();
        assert_eq!(classes.len(), 4);

        // At most one entry per class per octave.
        let unique: HashSet<SampleKey> = CATALOG.iter().copied().collect();
        assert_eq!(unique.len(), CATALOG.len());
    }

    #[test]
    fn test_catalog_in_declaration_order() {
        let mut sorted = CATALOG.to_vec();
        sorted.sort_by_key(|k| k.declaration_rank());
        assert_eq!(sorted, CATALOG.to_vec());
    }

    #[test]
    fn test_key_pitch() {
        assert_eq!(SampleKey::new(CatalogClass::A, 0).pitch(), 21);
        assert_eq!(SampleKey::new(CatalogClass::C, 4).pitch(), 60);
        assert_eq!(SampleKey::new(CatalogClass::Ds, 4).pitch(), 63);
        assert_eq!(SampleKey::new(CatalogClass::Fs, 4).pitch(), 66);
        assert_eq!(SampleKey::new(CatalogClass::C, 8).pitch(), 108);
    }

    #[test]
    fn test_file_name() {
        let key = SampleKey::new(CatalogClass::Ds, 4);
        assert_eq!(key.to_string(), "Ds4v10");
        assert_eq!(key.file_name("mp3"), "Ds4v10.mp3");
    }

    #[test]
    fn test_file_name_round_trip_for_catalog() {
        for key in CATALOG.iter() {
            let parsed: SampleKey = key.file_name(DEFAULT_EXTENSION).parse().unwrap();
            assert_eq!(parsed.class(), key.class());
            assert_eq!(parsed.octave(), key.octave());
        }
    }

    #[test]
    fn test_parse_sharp_spelling() {
        let key: SampleKey = "F#3v10.wav".parse().unwrap();
        assert_eq!(key, SampleKey::new(CatalogClass::Fs, 3));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "E4v10.mp3".parse::<SampleKey>(),
            Err(CatalogError::UnknownClass("E".to_string()))
        );
        assert_eq!(
            "A9v10.mp3".parse::<SampleKey>(),
            Err(CatalogError::OctaveOutOfRange(9))
        );
        assert_eq!(
            "A4v5.mp3".parse::<SampleKey>(),
            Err(CatalogError::UnsupportedVelocity(5))
        );
        assert!(matches!(
            "A4.mp3".parse::<SampleKey>(),
            Err(CatalogError::InvalidName(_))
        ));
        assert!(matches!(
            "piano".parse::<SampleKey>(),
            Err(CatalogError::InvalidName(_))
        ));
    }

    #[test]
    fn test_entry_at() {
        assert_eq!(entry_at(60), Some(SampleKey::new(CatalogClass::C, 4)));
        assert_eq!(entry_at(62), None);
        assert_eq!(entry_at(21), Some(SampleKey::new(CatalogClass::A, 0)));
    }
}
