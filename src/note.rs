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

//! Pitches, pitch classes and equal-tempered tuning.

use std::fmt;
use std::str::FromStr;

/// A semitone position on the 128-step MIDI keyboard numbering. 60 is middle C (C4).
pub type PitchIndex = i32;

/// Lowest key of an 88-key keyboard (A0).
pub const LOWEST_KEY: PitchIndex = 21;

/// Highest key of an 88-key keyboard (C8).
pub const HIGHEST_KEY: PitchIndex = 108;

/// Concert A (A4).
pub const DEFAULT_REFERENCE_PITCH: PitchIndex = 69;

/// Frequency of the reference pitch in Hz.
pub const DEFAULT_REFERENCE_FREQUENCY: f64 = 440.0;

/// Errors produced while parsing note names.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("invalid note name: {0}")]
    InvalidName(String),

    #[error("invalid octave in note {0}")]
    InvalidOctave(String),
}

/// Clamps a pitch into the playable keyboard span.
pub fn clamp_to_keyboard(pitch: PitchIndex) -> PitchIndex {
    pitch.clamp(LOWEST_KEY, HIGHEST_KEY)
}

/// Returns the scientific pitch notation octave of the pitch (C4 = 60).
pub fn octave_of(pitch: PitchIndex) -> i32 {
    pitch.div_euclid(12) - 1
}

/// Builds a pitch from its class and octave.
pub fn pitch_of(class: PitchClass, octave: i32) -> PitchIndex {
    (octave + 1) * 12 + class.semitone()
}

/// One of the twelve equal-tempered pitch classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes, ordered by semitone from C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Gets the pitch class of the given pitch.
    pub fn from_index(pitch: PitchIndex) -> PitchClass {
        Self::ALL[pitch.rem_euclid(12) as usize]
    }

    /// Semitones above C.
    pub fn semitone(self) -> i32 {
        self as i32
    }

    /// The name of the pitch class using sharps.
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Parses a letter plus an optional accidental into semitones above C, without
    /// wrapping (Cb is -1). Sharps may be spelled `#` or `s` (the filesystem-safe
    /// spelling), flats `b`.
    fn parse_semitone(letter: char, accidental: Option<char>) -> Option<i32> {
        let natural = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };
        let offset = match accidental {
            None => 0,
            Some('#') | Some('s') => 1,
            Some('b') => -1,
            Some(_) => return None,
        };
        Some(natural + offset)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_name(s).map(PitchClass::from_index)
    }
}

fn parse_name(s: &str) -> Result<i32, NoteError> {
    let mut chars = s.chars();
    let parsed = match (chars.next(), chars.next(), chars.next()) {
        (Some(letter), accidental, None) => PitchClass::parse_semitone(letter, accidental),
        _ => None,
    };
    parsed.ok_or_else(|| NoteError::InvalidName(s.to_string()))
}

/// Parses a note such as `C4`, `C#4`, `Db4`, `Ds4` or a bare MIDI number such as `60`.
pub fn parse_note(s: &str) -> Result<PitchIndex, NoteError> {
    let s = s.trim();
    if let Ok(pitch) = s.parse::<PitchIndex>() {
        return Ok(pitch);
    }

    let split = s
        .find(|c: char| c.is_ascii_digit() || c == '-')
        .ok_or_else(|| NoteError::InvalidOctave(s.to_string()))?;
    let (name, octave) = s.split_at(split);
    let semitone = parse_name(name)?;
    let octave: i32 = octave
        .parse()
        .map_err(|_| NoteError::InvalidOctave(s.to_string()))?;

    Ok((octave + 1) * 12 + semitone)
}

/// Formats a pitch as a note name, e.g. 61 -> `C#4`.
pub fn note_name(pitch: PitchIndex) -> String {
    format!("{}{}", PitchClass::from_index(pitch), octave_of(pitch))
}

/// Equal-tempered tuning anchored at a reference pitch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tuning {
    reference_pitch: PitchIndex,
    reference_frequency: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning::new(DEFAULT_REFERENCE_PITCH, DEFAULT_REFERENCE_FREQUENCY)
    }
}

impl Tuning {
    /// Creates a new tuning.
    pub fn new(reference_pitch: PitchIndex, reference_frequency: f64) -> Tuning {
        Tuning {
            reference_pitch,
            reference_frequency,
        }
    }

    /// Frequency in Hz of the pitch after clamping it to the keyboard span.
    /// Callers must still check the result is finite; a bad reference frequency
    /// propagates through.
    pub fn frequency(&self, pitch: PitchIndex) -> f64 {
        let pitch = clamp_to_keyboard(pitch);
        let semitones = pitch as f64 - self.reference_pitch as f64;
        self.reference_frequency * 2f64.powf(semitones / 12.0)
    }
}
