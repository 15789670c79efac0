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

//! How far a sample may be transposed before synthesis sounds better.

use crate::note::PitchClass;

use super::resolver::widest_offset_class;

/// Default largest shift accepted for sample playback.
pub const DEFAULT_MAX_SHIFT: u32 = 4;

/// Default largest shift accepted for the wide class.
pub const DEFAULT_WIDE_MAX_SHIFT: u32 = 12;

/// Decides whether a transposed sample still sounds better than synthesis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PitchShiftPolicy {
    max_shift: u32,
    wide_max_shift: u32,
    wide_class: PitchClass,
}

impl Default for PitchShiftPolicy {
    fn default() -> Self {
        PitchShiftPolicy::new(DEFAULT_MAX_SHIFT, DEFAULT_WIDE_MAX_SHIFT)
    }
}

impl PitchShiftPolicy {
    /// Creates a policy. The wide limit applies to the pitch class with the
    /// largest note mapping offset.
    pub fn new(max_shift: u32, wide_max_shift: u32) -> PitchShiftPolicy {
        PitchShiftPolicy {
            max_shift,
            wide_max_shift,
            wide_class: widest_offset_class(),
        }
    }

    /// The limit for the requested pitch class.
    pub fn limit_for(&self, class: PitchClass) -> u32 {
        if class == self.wide_class {
            self.wide_max_shift
        } else {
            self.max_shift
        }
    }

    /// Whether sample playback is acceptable for the requested pitch class at
    /// the given shift.
    pub fn should_use_sample(&self, class: PitchClass, shift: i32) -> bool {
        shift.unsigned_abs() <= self.limit_for(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let policy = PitchShiftPolicy::default();
        for class in PitchClass::ALL {
            if class == PitchClass::B {
                continue;
            }
            assert!(policy.should_use_sample(class, 4));
            assert!(policy.should_use_sample(class, -4));
            assert!(!policy.should_use_sample(class, 5));
            assert!(!policy.should_use_sample(class, -5));
        }
    }

    #[test]
    fn test_wide_class() {
        let policy = PitchShiftPolicy::default();
        assert!(policy.should_use_sample(PitchClass::B, 12));
        assert!(policy.should_use_sample(PitchClass::B, -10));
        assert!(!policy.should_use_sample(PitchClass::B, 13));
        assert_eq!(policy.limit_for(PitchClass::B), 12);
        assert_eq!(policy.limit_for(PitchClass::D), 4);
    }

    #[test]
    fn test_extreme_shift() {
        let policy = PitchShiftPolicy::default();
        assert!(!policy.should_use_sample(PitchClass::B, i32::MIN));
    }

    #[test]
    fn test_custom_limits() {
        let policy = PitchShiftPolicy::new(2, 6);
        assert!(!policy.should_use_sample(PitchClass::C, 3));
        assert!(policy.should_use_sample(PitchClass::B, 6));
    }
}
