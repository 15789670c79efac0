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

//! The note-on/note-off boundary. Owns the audio context, the loaded samples
//! and the voices that are currently held down.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use midly::live::LiveEvent;
use midly::MidiMessage;
use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::catalog::CATALOG;
use super::loader::{DirectoryStore, SampleBank, SampleLoader};
use super::synth::Synthesizer;
use super::voice::Voice;
use crate::audio::AudioContext;
use crate::config;
use crate::config::ConfigError;
use crate::note::PitchIndex;

/// MIDI "All Notes Off" controller.
const ALL_NOTES_OFF: u8 = 123;

/// Loads every catalog sample from the configured directory.
pub async fn load_samples<F>(config: &config::Engine, on_progress: F) -> SampleBank
where
    F: FnMut(u8),
{
    let store = DirectoryStore::new(&config.sample_path(), config.sample_extension());
    SampleLoader::new(Arc::new(store))
        .load_all(&CATALOG, on_progress)
        .await
}

/// Plays notes on the audio output.
///
/// If the output could not be opened the engine is unavailable and every note
/// is silently dropped.
pub struct NoteEngine {
    context: Option<AudioContext>,
    bank: SampleBank,
    synthesizer: Synthesizer,
    /// Fade applied when a note is released.
    release: Duration,
    /// 0-indexed channel to listen on, or all channels.
    midi_channel: Option<u8>,
    /// Voices started by note on, by pitch.
    voices: RwLock<HashMap<PitchIndex, Voice>>,
}

impl NoteEngine {
    /// Opens the configured audio output and creates an engine around it.
    pub fn open(config: &config::Engine, bank: SampleBank) -> Result<NoteEngine, ConfigError> {
        let context = match AudioContext::open(config.audio()) {
            Ok(context) => Some(context),
            Err(e) => {
                error!(
                    err = %e,
                    device = config.audio().device(),
                    "Audio output unavailable, notes will be silent"
                );
                None
            }
        };
        let synthesizer = Synthesizer::new(config.tuning(), config.pitch_shift_policy());

        Ok(NoteEngine::new(
            context,
            bank,
            synthesizer,
            config.release()?,
            config.midi_channel()?,
        ))
    }

    /// Creates an engine. A `None` context makes the engine unavailable.
    pub fn new(
        context: Option<AudioContext>,
        bank: SampleBank,
        synthesizer: Synthesizer,
        release: Duration,
        midi_channel: Option<u8>,
    ) -> NoteEngine {
        info!(
            available = context.is_some(),
            samples = bank.len(),
            release_ms = release.as_millis(),
            "Note engine created"
        );
        NoteEngine {
            context,
            bank,
            synthesizer,
            release,
            midi_channel,
            voices: RwLock::new(HashMap::new()),
        }
    }

    /// Whether notes can be heard.
    pub fn is_available(&self) -> bool {
        self.context
            .as_ref()
            .is_some_and(|context| !context.is_closed())
    }

    pub fn context(&self) -> Option<&AudioContext> {
        self.context.as_ref()
    }

    pub fn bank(&self) -> &SampleBank {
        &self.bank
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    pub fn release(&self) -> Duration {
        self.release
    }

    /// Starts a voice the caller owns. `None` means the key press is silent.
    pub fn play(&self, pitch: PitchIndex) -> Option<Voice> {
        let Some(context) = self.context.as_ref().filter(|context| !context.is_closed()) else {
            debug!(pitch, "Audio unavailable, ignoring note");
            return None;
        };
        // Failures are logged by the synthesizer.
        self.synthesizer.play(context, pitch, &self.bank).ok()
    }

    /// Releases a voice with the configured fade. Returns false if it was
    /// already stopped.
    pub fn stop(&self, voice: &Voice) -> bool {
        match self.context.as_ref() {
            Some(context) => voice.stop(context, self.release),
            None => false,
        }
    }

    /// Starts a held voice for the pitch, releasing any voice already held on it.
    /// Velocity does not scale the envelope.
    pub fn note_on(&self, pitch: PitchIndex, velocity: u8) -> bool {
        let Some(voice) = self.play(pitch) else {
            return false;
        };
        debug!(
            pitch,
            velocity,
            voice = voice.id(),
            path = ?voice.path(),
            "Note on"
        );

        let previous = self.voices.write().insert(pitch, voice);
        if let Some(previous) = previous {
            self.stop(&previous);
        }
        true
    }

    /// Releases the voice held on the pitch.
    pub fn note_off(&self, pitch: PitchIndex) -> bool {
        let Some(voice) = self.voices.write().remove(&pitch) else {
            debug!(pitch, "Note off without a held voice");
            return false;
        };
        debug!(pitch, voice = voice.id(), "Note off");
        self.stop(&voice)
    }

    /// Processes an incoming MIDI event.
    pub fn process_midi_event(&self, raw_event: &[u8]) {
        let event = match LiveEvent::parse(raw_event) {
            Ok(e) => e,
            Err(e) => {
                debug!(error = ?e, "Failed to parse MIDI event");
                return;
            }
        };

        let LiveEvent::Midi { channel, message } = event else {
            return;
        };
        if let Some(listen) = self.midi_channel {
            if u8::from(channel) != listen {
                return;
            }
        }

        match message {
            // Note On with velocity 0 is equivalent to Note Off
            MidiMessage::NoteOn { key, vel } if u8::from(vel) == 0 => {
                self.note_off(u8::from(key).into());
            }
            MidiMessage::NoteOn { key, vel } => {
                self.note_on(u8::from(key).into(), u8::from(vel));
            }
            MidiMessage::NoteOff { key, .. } => {
                self.note_off(u8::from(key).into());
            }
            MidiMessage::Controller { controller, .. }
                if u8::from(controller) == ALL_NOTES_OFF =>
            {
                self.stop_all();
            }
            _ => {}
        }
    }

    /// Releases every held voice. Returns how many were stopped.
    pub fn stop_all(&self) -> usize {
        let voices: Vec<Voice> = self.voices.write().drain().map(|(_, v)| v).collect();
        let stopped = voices.iter().filter(|voice| self.stop(voice)).count();

        if stopped > 0 {
            info!(stopped, "All notes stopped");
        }
        stopped
    }

    /// Returns the number of held voices that are still sounding.
    pub fn active_voice_count(&self) -> usize {
        self.voices
            .read()
            .values()
            .filter(|voice| !voice.is_finished())
            .count()
    }

    /// Releases every voice and closes the audio context. Notes played
    /// afterwards are silent.
    pub fn shutdown(&self) {
        self.stop_all();
        if let Some(context) = self.context.as_ref() {
            context.close();
        }
        info!("Note engine shut down");
    }
}

impl std::fmt::Debug for NoteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteEngine")
            .field("available", &self.is_available())
            .field("samples", &self.bank.len())
            .field("active_voices", &self.active_voice_count())
            .field("memory_kb", &(self.bank.total_memory_usage() / 1024))
            .finish()
    }
}
