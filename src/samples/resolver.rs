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

//! Maps arbitrary pitches onto the sparse set of available samples.
//!
//! Resolution never fails while at least one sample is available. It walks a
//! fixed ladder of increasingly lossy matches:
//!
//! 1. an exact recording of the pitch (shift 0),
//! 2. the mapped recorded class in the same octave (shift from [`NOTE_MAPPING`]),
//! 3. the mapped class in the nearest available octave (true distance),
//! 4. A4 if it is available, otherwise the closest recording of any class.

use tracing::debug;

use crate::note::{octave_of, PitchClass, PitchIndex};

use super::catalog::{CatalogClass, SampleKey};

/// The recorded class and same-octave semitone offset used for each pitch class,
/// indexed by semitone above C.
pub static NOTE_MAPPING: [(CatalogClass, i32); 12] = [
    (CatalogClass::C, 0),   // C
    (CatalogClass::C, 1),   // C#
    (CatalogClass::Ds, -1), // D
    (CatalogClass::Ds, 0),  // D#
    (CatalogClass::Ds, 1),  // E
    (CatalogClass::Fs, -1), // F
    (CatalogClass::Fs, 0),  // F#
    (CatalogClass::Fs, 1),  // G
    (CatalogClass::A, -1),  // G#
    (CatalogClass::A, 0),   // A
    (CatalogClass::A, 1),   // A#
    (CatalogClass::A, 2),   // B
];

/// Used when nothing of the mapped class is available.
pub const FALLBACK_KEY: SampleKey = SampleKey::new(CatalogClass::A, 4);

/// Looks up the mapping for a pitch class.
pub fn mapping_for(class: PitchClass) -> (CatalogClass, i32) {
    NOTE_MAPPING[class.semitone() as usize]
}

/// The pitch class whose mapping carries the largest absolute offset.
pub fn widest_offset_class() -> PitchClass {
    PitchClass::ALL
        .into_iter()
        .max_by_key(|class| mapping_for(*class).1.abs())
        .unwrap_or(PitchClass::B)
}

/// Which rung of the resolution ladder produced a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Exact,
    SameOctave,
    NearestOctave,
    Fallback,
}

/// A chosen sample and the signed semitone distance from its recorded pitch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedSample {
    pub key: SampleKey,
    pub shift: i32,
    pub resolution: Resolution,
}

impl ResolvedSample {
    /// Playback rate that transposes the sample by `shift` semitones.
    pub fn playback_rate(&self) -> f64 {
        2f64.powf(self.shift as f64 / 12.0)
    }
}

/// Resolves a pitch against the available samples. Returns `None` only when no
/// samples are available.
pub fn resolve(pitch: PitchIndex, available: &[SampleKey]) -> Option<ResolvedSample> {
    let resolved = resolve_inner(pitch, available)?;
    debug!(
        pitch,
        sample = %resolved.key,
        shift = resolved.shift,
        resolution = ?resolved.resolution,
        "Resolved note"
    );
    Some(resolved)
}

fn resolve_inner(pitch: PitchIndex, available: &[SampleKey]) -> Option<ResolvedSample> {
    let true_shift = |key: SampleKey| pitch.saturating_sub(key.pitch());

    if let Some(key) = available.iter().copied().find(|key| key.pitch() == pitch) {
        return Some(ResolvedSample {
            key,
            shift: 0,
            resolution: Resolution::Exact,
        });
    }

    let octave = octave_of(pitch);
    let (class, offset) = mapping_for(PitchClass::from_index(pitch));

    let candidate = SampleKey::new(class, octave);
    if available.contains(&candidate) {
        return Some(ResolvedSample {
            key: candidate,
            shift: offset,
            resolution: Resolution::SameOctave,
        });
    }

    // Ties go to the first key in declaration order.
    let nearest = available
        .iter()
        .copied()
        .filter(|key| key.class() == class)
        .min_by_key(|key| (key.octave().abs_diff(octave), key.declaration_rank()));
    if let Some(key) = nearest {
        return Some(ResolvedSample {
            key,
            shift: true_shift(key),
            resolution: Resolution::NearestOctave,
        });
    }

    let key = if available.contains(&FALLBACK_KEY) {
        FALLBACK_KEY
    } else {
        available
            .iter()
            .copied()
            .min_by_key(|key| (true_shift(*key).unsigned_abs(), key.declaration_rank()))?
    };
    Some(ResolvedSample {
        key,
        shift: true_shift(key),
        resolution: Resolution::Fallback,
    })
}
