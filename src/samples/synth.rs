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

//! Turns a pitch into a sounding voice, preferring a transposed sample and
//! falling back to oscillators.

use tracing::{debug, error, warn};

use super::catalog::SampleKey;
use super::envelope::{compute_envelope, EnvelopeProfile, PlaybackPath};
use super::loader::SampleBank;
use super::policy::PitchShiftPolicy;
use super::resolver::{resolve, ResolvedSample};
use super::voice::{Voice, VoiceSources};
use crate::audio::automation::GainParam;
use crate::audio::error::{GeneratorError, SourceError};
use crate::audio::generator::{BufferPlayer, Generator, Oscillator, Waveform};
use crate::audio::mixer::SourceHandle;
use crate::audio::{AudioContext, AudioError};
use crate::note::{PitchClass, PitchIndex, Tuning};

/// Errors raised while building a voice.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("frequency for pitch {0} is not finite")]
    NonFiniteFrequency(PitchIndex),

    #[error("playback rate for a shift of {0} semitones is not finite")]
    NonFinitePlaybackRate(i32),

    #[error("sample {0} is not loaded")]
    MissingSample(String),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// What playing a pitch will do, before anything is started.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NotePlan {
    pub pitch: PitchIndex,
    /// The closest loaded sample, if any are loaded.
    pub resolved: Option<ResolvedSample>,
    pub path: PlaybackPath,
    pub envelope: EnvelopeProfile,
}

/// Builds voices on an audio context.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Synthesizer {
    tuning: Tuning,
    policy: PitchShiftPolicy,
}

impl Synthesizer {
    pub fn new(tuning: Tuning, policy: PitchShiftPolicy) -> Synthesizer {
        Synthesizer { tuning, policy }
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn policy(&self) -> &PitchShiftPolicy {
        &self.policy
    }

    /// Resolves the pitch against the available samples and picks a playback
    /// path.
    pub fn plan(&self, pitch: PitchIndex, available: &[SampleKey]) -> NotePlan {
        let resolved = resolve(pitch, available);
        let class = PitchClass::from_index(pitch);
        let path = match resolved {
            Some(resolved) if self.policy.should_use_sample(class, resolved.shift) => {
                PlaybackPath::Sample
            }
            _ => PlaybackPath::Synthesis,
        };
        let shift = resolved.map_or(0, |resolved| resolved.shift);

        NotePlan {
            pitch,
            resolved,
            path,
            envelope: compute_envelope(shift, path),
        }
    }

    /// Starts a voice for the pitch. A sample is used when one is close enough;
    /// otherwise, or if the sample cannot be started, the pitch is synthesized.
    pub fn play(
        &self,
        context: &AudioContext,
        pitch: PitchIndex,
        bank: &SampleBank,
    ) -> Result<Voice, SynthError> {
        let plan = self.plan(pitch, bank.keys());

        match (plan.path, plan.resolved) {
            (PlaybackPath::Sample, Some(resolved)) => {
                debug!(
                    pitch,
                    sample = %resolved.key,
                    shift = resolved.shift,
                    "Using sample"
                );
                match self.start_sample(context, pitch, resolved, &plan.envelope, bank) {
                    Ok(voice) => return Ok(voice),
                    Err(e) => warn!(
                        pitch,
                        sample = %resolved.key,
                        err = %e,
                        "Sample playback failed, synthesizing instead"
                    ),
                }
            }
            (_, resolved) => debug!(
                pitch,
                shift = resolved.map(|resolved| resolved.shift),
                "Using synthesis"
            ),
        }

        self.start_synthesis(context, pitch).inspect_err(|e| {
            error!(pitch, err = %e, "Unable to produce a voice");
        })
    }

    fn start_sample(
        &self,
        context: &AudioContext,
        pitch: PitchIndex,
        resolved: ResolvedSample,
        envelope: &EnvelopeProfile,
        bank: &SampleBank,
    ) -> Result<Voice, SynthError> {
        let sample = bank
            .get(&resolved.key)
            .ok_or_else(|| SynthError::MissingSample(resolved.key.to_string()))?;
        let rate = resolved.playback_rate();
        if !rate.is_finite() {
            return Err(SynthError::NonFinitePlaybackRate(resolved.shift));
        }
        let player = BufferPlayer::new(sample.clone(), rate, context.sample_rate())?;

        let gain = GainParam::new(0.0);
        let now = context.current_time();
        envelope.apply(&gain, now);
        let player = context.start_source(Generator::Buffer(player), gain)?;

        Ok(Voice::new(pitch, VoiceSources::Sample { player }, now))
    }

    fn start_synthesis(
        &self,
        context: &AudioContext,
        pitch: PitchIndex,
    ) -> Result<Voice, SynthError> {
        let frequency = self.tuning.frequency(pitch);
        if !frequency.is_finite() {
            return Err(SynthError::NonFiniteFrequency(pitch));
        }
        let sample_rate = context.sample_rate();
        let primary = Oscillator::new(Waveform::Sine, frequency, sample_rate)?;
        let sub = Oscillator::new(Waveform::Triangle, frequency / 2.0, sample_rate)?;

        let now = context.current_time();
        let primary_gain = GainParam::new(0.0);
        EnvelopeProfile::for_oscillator().apply(&primary_gain, now);
        let sub_gain = GainParam::new(0.0);
        EnvelopeProfile::for_sub_oscillator().apply(&sub_gain, now);

        let oscillator = context.start_source(Generator::Oscillator(primary), primary_gain)?;
        let sub_oscillator = match context.start_source(Generator::Oscillator(sub), sub_gain) {
            Ok(handle) => handle,
            Err(e) => {
                // Don't leave half a voice sounding.
                abandon(context, &oscillator);
                return Err(e.into());
            }
        };

        Ok(Voice::new(
            pitch,
            VoiceSources::Synth {
                oscillator,
                sub_oscillator,
            },
            now,
        ))
    }
}

/// Stops a source belonging to a voice that never finished starting. Returns
/// false if the source had already stopped.
fn abandon(context: &AudioContext, handle: &SourceHandle) -> bool {
    match handle.stop_at(context.current_sample()) {
        Ok(()) => true,
        Err(SourceError::AlreadyStopped(source)) => {
            debug!(source, "Source already stopped");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::automation::SILENCE_FLOOR;
    use crate::audio::decode::DecodedSample;
    use crate::samples::catalog::{CatalogClass, CATALOG};
    use crate::samples::resolver::Resolution;
    use crate::samples::voice::DEFAULT_RELEASE;
    use crate::testutil::{calculate_rms, mock_context, test_bank};

    #[test]
    fn test_exact_pitch_uses_sample() {
        let synth = Synthesizer::default();
        let plan = synth.plan(60, &CATALOG);

        let resolved = plan.resolved.unwrap();
        assert_eq!(resolved.key, SampleKey::new(CatalogClass::C, 4));
        assert_eq!(resolved.shift, 0);
        assert_eq!(plan.path, PlaybackPath::Sample);
        assert_eq!(plan.envelope, EnvelopeProfile::for_sample(0));
    }

    #[test]
    fn test_neighbor_pitch_uses_shifted_sample() {
        let synth = Synthesizer::default();
        let plan = synth.plan(62, &CATALOG);

        let resolved = plan.resolved.unwrap();
        assert_eq!(resolved.key, SampleKey::new(CatalogClass::Ds, 4));
        assert_eq!(resolved.shift, -1);
        assert_eq!(resolved.resolution, Resolution::SameOctave);
        assert_eq!(plan.path, PlaybackPath::Sample);
    }

    #[test]
    fn test_large_shift_synthesizes() {
        let synth = Synthesizer::default();
        let available = [SampleKey::new(CatalogClass::C, 4)];

        // G4 is seven semitones from the only sample.
        let plan = synth.plan(67, &available);
        assert_eq!(plan.resolved.map(|r| r.shift), Some(7));
        assert_eq!(plan.path, PlaybackPath::Synthesis);
        assert_eq!(plan.envelope, EnvelopeProfile::for_oscillator());

        // B4 gets the wide limit.
        let plan = synth.plan(71, &available);
        assert_eq!(plan.resolved.map(|r| r.shift), Some(11));
        assert_eq!(plan.path, PlaybackPath::Sample);
    }

    #[test]
    fn test_empty_bank_synthesizes() {
        let synth = Synthesizer::default();
        let plan = synth.plan(60, &[]);
        assert_eq!(plan.resolved, None);
        assert_eq!(plan.path, PlaybackPath::Synthesis);
    }

    #[test]
    fn test_play_sample_voice() {
        let context = mock_context(1000);
        let synth = Synthesizer::default();
        let bank = test_bank(&CATALOG);
        context.mixer().process_frames(100);

        let voice = synth.play(&context, 62, &bank).unwrap();
        assert_eq!(voice.path(), PlaybackPath::Sample);
        assert_eq!(voice.pitch(), 62);
        assert!((voice.start_time() - 0.1).abs() < 1e-12);

        let VoiceSources::Sample { player } = voice.sources() else {
            panic!("expected a sample voice");
        };
        assert_eq!(player.gain().value_at(0.1), 0.0);
        assert!((player.gain().value_at(0.12) - 1.0).abs() < 1e-4);
        assert_eq!(context.mixer().active_source_count(), 1);
    }

    #[test]
    fn test_play_synth_voice() {
        let context = mock_context(1000);
        let synth = Synthesizer::default();

        let voice = synth.play(&context, 69, &SampleBank::default()).unwrap();
        assert_eq!(voice.path(), PlaybackPath::Synthesis);
        let VoiceSources::Synth {
            oscillator,
            sub_oscillator,
        } = voice.sources()
        else {
            panic!("expected a synth voice");
        };
        assert!((oscillator.gain().value_at(0.02) - 0.2).abs() < 1e-4);
        assert!((sub_oscillator.gain().value_at(0.02) - 0.1).abs() < 1e-4);
        assert!((oscillator.gain().value_at(1.5) - SILENCE_FLOOR).abs() < 1e-6);
        assert_eq!(context.mixer().active_source_count(), 2);

        let frames = context.mixer().process_frames(50);
        assert!(calculate_rms(&frames) > 0.0);
    }

    #[test]
    fn test_synth_voice_ends_naturally() {
        let context = mock_context(100);
        let synth = Synthesizer::default();
        let voice = synth.play(&context, 60, &SampleBank::default()).unwrap();

        context.mixer().process_frames(160);
        assert!(voice.is_finished());
        assert_eq!(context.mixer().released_count(), 2);

        assert!(voice.stop(&context, DEFAULT_RELEASE));
        context.mixer().process_frames(20);
        assert_eq!(context.mixer().released_count(), 2);
    }

    #[test]
    fn test_broken_sample_falls_back_to_synthesis() {
        let context = mock_context(100);
        let synth = Synthesizer::default();
        let mut bank = SampleBank::default();
        bank.insert(
            SampleKey::new(CatalogClass::C, 4),
            DecodedSample::new(Vec::new(), 1, 44100),
        );

        assert_eq!(synth.plan(60, bank.keys()).path, PlaybackPath::Sample);
        let voice = synth.play(&context, 60, &bank).unwrap();
        assert_eq!(voice.path(), PlaybackPath::Synthesis);
        assert_eq!(context.mixer().active_source_count(), 2);
    }

    #[test]
    fn test_non_finite_frequency() {
        let context = mock_context(100);
        let synth = Synthesizer::new(Tuning::new(69, f64::NAN), PitchShiftPolicy::default());

        let result = synth.play(&context, 60, &SampleBank::default());
        assert!(matches!(result, Err(SynthError::NonFiniteFrequency(60))));
        assert_eq!(context.mixer().active_source_count(), 0);
    }

    #[test]
    fn test_abandon_partial_voice() {
        let context = mock_context(100);
        let oscillator = Oscillator::new(Waveform::Sine, 10.0, 100).unwrap();
        let handle = context
            .start_source(Generator::Oscillator(oscillator), GainParam::new(1.0))
            .unwrap();
        context.mixer().process_frames(4);

        assert!(abandon(&context, &handle));
        assert!(!abandon(&context, &handle));
        context.mixer().process_frames(4);
        assert!(handle.is_finished());
        assert_eq!(context.mixer().active_source_count(), 0);
    }

    #[test]
    fn test_closed_context() {
        let context = mock_context(100);
        context.close();
        let synth = Synthesizer::default();
        let bank = test_bank(&CATALOG);

        let result = synth.play(&context, 60, &bank);
        assert!(matches!(result, Err(SynthError::Audio(AudioError::Closed))));
    }
}
