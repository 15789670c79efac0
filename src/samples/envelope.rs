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

//! Attack, decay and release shapes applied to voice gains.
//!
//! All times are offsets from the moment the voice starts: the gain reaches
//! `peak_level` at `attack_time`, `decay_level` at `decay_time` and fades to
//! `release_level` at `release_time`.

use crate::audio::automation::{GainParam, SILENCE_FLOOR};

/// How a voice produces sound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackPath {
    /// A recorded sample, transposed by playback rate.
    Sample,
    /// Oscillators.
    Synthesis,
}

/// Timing and levels of a voice envelope.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeProfile {
    pub attack_time: f64,
    pub peak_level: f32,
    pub decay_time: f64,
    pub decay_level: f32,
    pub release_time: f64,
    pub release_level: f32,
}

impl EnvelopeProfile {
    /// The envelope of a sample transposed by `shift` semitones. Larger shifts
    /// shorten the decay and the release.
    pub fn for_sample(shift: i32) -> EnvelopeProfile {
        let shift_factor = shift.unsigned_abs() as f64 / 12.0;
        EnvelopeProfile {
            attack_time: 0.02,
            peak_level: 1.0,
            decay_time: 0.5 * (1.0 - shift_factor * 0.2),
            decay_level: 0.7,
            release_time: 4.0 * (1.0 - shift_factor * 0.1),
            release_level: SILENCE_FLOOR,
        }
    }

    /// The envelope of the primary synthesis oscillator.
    pub fn for_oscillator() -> EnvelopeProfile {
        EnvelopeProfile {
            attack_time: 0.02,
            peak_level: 0.2,
            decay_time: 0.3,
            decay_level: 0.15,
            release_time: 1.5,
            release_level: SILENCE_FLOOR,
        }
    }

    /// The envelope of the synthesis sub-oscillator.
    pub fn for_sub_oscillator() -> EnvelopeProfile {
        EnvelopeProfile {
            peak_level: 0.1,
            decay_level: 0.08,
            ..Self::for_oscillator()
        }
    }

    /// Schedules the envelope on the gain starting at `start` seconds.
    pub fn apply(&self, gain: &GainParam, start: f64) {
        gain.set_value_at_time(0.0, start);
        gain.linear_ramp_to_value_at_time(self.peak_level, start + self.attack_time);
        gain.linear_ramp_to_value_at_time(self.decay_level, start + self.decay_time);
        gain.exponential_ramp_to_value_at_time(self.release_level, start + self.release_time);
    }
}

/// The envelope for a voice. Synthesis uses a fixed profile; see
/// [`EnvelopeProfile::for_sub_oscillator`] for its second gain.
pub fn compute_envelope(shift: i32, path: PlaybackPath) -> EnvelopeProfile {
    match path {
        PlaybackPath::Sample => EnvelopeProfile::for_sample(shift),
        PlaybackPath::Synthesis => EnvelopeProfile::for_oscillator(),
    }
}
