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

//! A sounding note and its two-phase stop.
//!
//! Stopping a voice first fades every gain it owns from its current level to
//! the silence floor, then drops its sources from the mixer once the fade has
//! run its course on the audio clock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

use super::envelope::PlaybackPath;
use crate::audio::automation::SILENCE_FLOOR;
use crate::audio::error::SourceError;
use crate::audio::mixer::SourceHandle;
use crate::audio::AudioContext;
use crate::note::PitchIndex;

/// Default fade applied when a voice is stopped.
pub const DEFAULT_RELEASE: Duration = Duration::from_millis(100);

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// The mixer sources behind a voice.
#[derive(Debug)]
pub enum VoiceSources {
    /// A transposed sample.
    Sample { player: SourceHandle },
    /// A sine oscillator and a triangle an octave below it.
    Synth {
        oscillator: SourceHandle,
        sub_oscillator: SourceHandle,
    },
}

impl VoiceSources {
    fn handles(&self) -> Vec<&SourceHandle> {
        match self {
            VoiceSources::Sample { player } => vec![player],
            VoiceSources::Synth {
                oscillator,
                sub_oscillator,
            } => vec![oscillator, sub_oscillator],
        }
    }
}

/// Represents a note that is playing.
#[derive(Debug)]
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    /// The pitch that was requested.
    pitch: PitchIndex,
    sources: VoiceSources,
    /// Audio clock time, in seconds, at which the voice started.
    start_time: f64,
    /// Set by the first stop.
    disposed: AtomicBool,
}

impl Voice {
    pub(crate) fn new(pitch: PitchIndex, sources: VoiceSources, start_time: f64) -> Voice {
        Voice {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst),
            pitch,
            sources,
            start_time,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pitch(&self) -> PitchIndex {
        self.pitch
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn sources(&self) -> &VoiceSources {
        &self.sources
    }

    pub fn path(&self) -> PlaybackPath {
        match self.sources {
            VoiceSources::Sample { .. } => PlaybackPath::Sample,
            VoiceSources::Synth { .. } => PlaybackPath::Synthesis,
        }
    }

    /// Returns true once the voice has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Returns true once the mixer has released every source of the voice.
    pub fn is_finished(&self) -> bool {
        self.sources.handles().iter().all(|h| h.is_finished())
    }

    /// Fades the voice out over `fade` and schedules its sources to be dropped
    /// when the fade ends. Returns false if the voice was already stopped.
    ///
    /// Sources that ended on their own are left alone.
    pub fn stop(&self, context: &AudioContext, fade: Duration) -> bool {
        if self.disposed.swap(true, Ordering::SeqCst) {
            debug!(voice = self.id, pitch = self.pitch, "Voice already stopped");
            return false;
        }

        let now_sample = context.current_sample();
        let now = now_sample as f64 / context.sample_rate() as f64;
        let fade_end = now + fade.as_secs_f64();
        let stop_sample = now_sample + context.duration_to_samples(fade);

        for handle in self.sources.handles() {
            let held = handle.gain().hold_at(now);
            handle
                .gain()
                .exponential_ramp_to_value_at_time(SILENCE_FLOOR, fade_end);

            match handle.stop_at(stop_sample) {
                Ok(()) => {}
                Err(SourceError::AlreadyStopped(source)) => {
                    debug!(voice = self.id, source, "Source already stopped");
                }
            }
            debug!(
                voice = self.id,
                source = handle.id(),
                from = held,
                stop_sample,
                "Fading out source"
            );
        }

        debug!(
            voice = self.id,
            pitch = self.pitch,
            fade_ms = fade.as_millis(),
            "Voice stopped"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::automation::GainParam;
    use crate::audio::decode::DecodedSample;
    use crate::audio::generator::{BufferPlayer, Generator, Oscillator, Waveform};
    use crate::testutil::mock_context;

    fn oscillator() -> Generator {
        Generator::Oscillator(Oscillator::new(Waveform::Sine, 10.0, 100).unwrap())
    }

    fn sample_voice(context: &AudioContext, generator: Generator, gain: f32) -> Voice {
        let player = context
            .start_source(generator, GainParam::new(gain))
            .unwrap();
        Voice::new(60, VoiceSources::Sample { player }, context.current_time())
    }

    #[test]
    fn test_stop_fades_then_releases() {
        let context = mock_context(100);
        let voice = sample_voice(&context, oscillator(), 1.0);
        context.mixer().process_frames(10);

        assert!(voice.stop(&context, Duration::from_millis(100)));
        assert!(voice.is_stopped());

        let VoiceSources::Sample { player } = voice.sources() else {
            panic!("expected a sample voice");
        };
        assert_eq!(player.scheduled_stop(), Some(20));
        assert_eq!(player.gain().value_at(0.1), 1.0);
        assert!((player.gain().value_at(0.2) - SILENCE_FLOOR).abs() < 1e-6);
        let midway = player.gain().value_at(0.15);
        assert!(midway < 1.0 && midway > SILENCE_FLOOR);

        context.mixer().process_frames(5);
        assert!(!voice.is_finished());
        context.mixer().process_frames(5);
        assert!(voice.is_finished());
        assert_eq!(context.mixer().released_count(), 1);
    }

    #[test]
    fn test_double_stop() {
        let context = mock_context(100);
        let voice = sample_voice(&context, oscillator(), 1.0);

        assert!(voice.stop(&context, DEFAULT_RELEASE));
        assert!(!voice.stop(&context, DEFAULT_RELEASE));

        context.mixer().process_frames(40);
        assert!(voice.is_finished());
        assert_eq!(context.mixer().released_count(), 1);
    }

    #[test]
    fn test_stop_after_natural_end() {
        let context = mock_context(100);
        let sample = DecodedSample::new(vec![0.5; 5], 1, 100);
        let player = BufferPlayer::new(sample, 1.0, 100).unwrap();
        let voice = sample_voice(&context, Generator::Buffer(player), 1.0);

        context.mixer().process_frames(10);
        assert!(voice.is_finished());
        assert_eq!(context.mixer().released_count(), 1);

        assert!(voice.stop(&context, DEFAULT_RELEASE));
        context.mixer().process_frames(20);
        assert_eq!(context.mixer().released_count(), 1);
    }

    #[test]
    fn test_synth_voice_stops_both_sources() {
        let context = mock_context(100);
        let oscillator_handle = context
            .start_source(oscillator(), GainParam::new(0.2))
            .unwrap();
        let sub_oscillator = context
            .start_source(oscillator(), GainParam::new(0.1))
            .unwrap();
        let voice = Voice::new(
            57,
            VoiceSources::Synth {
                oscillator: oscillator_handle,
                sub_oscillator,
            },
            0.0,
        );
        assert_eq!(voice.path(), PlaybackPath::Synthesis);
        assert_eq!(voice.pitch(), 57);

        assert!(voice.stop(&context, Duration::from_millis(50)));
        context.mixer().process_frames(10);
        assert!(voice.is_finished());
        assert_eq!(context.mixer().released_count(), 2);
    }

    #[test]
    fn test_voice_ids_are_unique() {
        let context = mock_context(100);
        let first = sample_voice(&context, oscillator(), 1.0);
        let second = sample_voice(&context, oscillator(), 1.0);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.path(), PlaybackPath::Sample);
    }
}
