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
// The process-wide audio context: one mixer, one running output, created once
// and reused by every voice until it is closed.
//

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::automation::GainParam;
use super::generator::Generator;
use super::mixer::{ActiveSource, SourceHandle};
use super::{AudioError, AudioMixer, Device, OutputStream, SourceSender};
use crate::config;

/// Owns the mixer and the output feeding the device.
pub struct AudioContext {
    mixer: Arc<AudioMixer>,
    source_tx: SourceSender,
    device_name: String,
    output: Mutex<Option<OutputStream>>,
    closed: AtomicBool,
}

impl AudioContext {
    /// Opens the configured device and starts pulling audio from a new mixer.
    pub fn open(config: &config::Audio) -> Result<AudioContext, AudioError> {
        let device = super::get_device(config)?;
        Self::with_device(device.as_ref(), config.sample_rate())
    }

    /// Starts a context on the given device.
    pub fn with_device(device: &dyn Device, sample_rate: u32) -> Result<AudioContext, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(sample_rate));
        }
        let mixer = Arc::new(AudioMixer::new(device.channels(), sample_rate));
        let output = device.start(mixer.clone())?;
        info!(
            device = device.to_string(),
            channels = mixer.num_channels(),
            sample_rate,
            "Audio context opened"
        );

        Ok(AudioContext {
            source_tx: mixer.source_sender(),
            mixer,
            device_name: device.to_string(),
            output: Mutex::new(Some(output)),
            closed: AtomicBool::new(false),
        })
    }

    /// Hands a generator to the mixer. It starts sounding at the next render
    /// block.
    pub fn start_source(
        &self,
        generator: Generator,
        gain: GainParam,
    ) -> Result<SourceHandle, AudioError> {
        if self.is_closed() {
            return Err(AudioError::Closed);
        }
        let (source, handle) = ActiveSource::new(generator, gain);
        self.source_tx.send(source).map_err(|_| AudioError::Closed)?;
        Ok(handle)
    }

    /// The audio clock in seconds.
    pub fn current_time(&self) -> f64 {
        self.mixer.current_time()
    }

    /// The audio clock in frames.
    pub fn current_sample(&self) -> u64 {
        self.mixer.current_sample()
    }

    /// Converts a duration into a number of frames at the context rate.
    pub fn duration_to_samples(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * self.sample_rate() as f64).round() as u64
    }

    pub fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    pub fn mixer(&self) -> &Arc<AudioMixer> {
        &self.mixer
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops the output and releases every source. Safe to call more than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(mut output) = self.output.lock().take() {
            output.shutdown();
        }
        let active = self.mixer.active_source_count();
        if active > 0 {
            warn!(active, "Closing audio context with sources still playing");
        }
        self.mixer.clear();
        info!(device = self.device_name, "Audio context closed");
    }
}

impl Drop for AudioContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::generator::{Oscillator, Waveform};
    use crate::audio::mock;

    fn mock_context() -> AudioContext {
        AudioContext::with_device(&mock::Device::get("mock"), 100).unwrap()
    }

    fn oscillator() -> Generator {
        Generator::Oscillator(Oscillator::new(Waveform::Sine, 10.0, 100).unwrap())
    }

    #[test]
    fn test_open_mock() {
        let context = AudioContext::open(&config::Audio::new("mock-device")).unwrap();
        assert_eq!(context.sample_rate(), 44100);
        assert_eq!(context.mixer().num_channels(), 2);
        assert_eq!(context.current_sample(), 0);
    }

    #[test]
    fn test_zero_sample_rate_is_rejected() {
        assert!(matches!(
            AudioContext::with_device(&mock::Device::get("mock"), 0),
            Err(AudioError::InvalidSampleRate(0))
        ));
    }

    #[test]
    fn test_clock_follows_mixer() {
        let context = mock_context();
        context.mixer().process_frames(25);
        assert_eq!(context.current_sample(), 25);
        assert!((context.current_time() - 0.25).abs() < 1e-12);
        assert_eq!(context.duration_to_samples(Duration::from_millis(100)), 10);
    }

    #[test]
    fn test_start_source() {
        let context = mock_context();
        let handle = context
            .start_source(oscillator(), GainParam::new(1.0))
            .unwrap();
        assert_eq!(context.mixer().active_source_count(), 1);

        let frames = context.mixer().process_frames(4);
        assert!(frames.iter().any(|s| *s != 0.0));
        assert!(!handle.is_finished());
    }

    #[test]
    fn test_closed_context_rejects_sources() {
        let context = mock_context();
        let handle = context
            .start_source(oscillator(), GainParam::new(1.0))
            .unwrap();

        context.close();
        context.close();

        assert!(context.is_closed());
        assert!(handle.is_finished());
        assert!(matches!(
            context.start_source(oscillator(), GainParam::new(1.0)),
            Err(AudioError::Closed)
        ));
    }
}
