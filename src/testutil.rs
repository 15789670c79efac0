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

//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::f32::consts::PI;
use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::decode::DecodedSample;
use crate::audio::{mock, AudioContext};
use crate::note::Tuning;
use crate::samples::catalog::SampleKey;
use crate::samples::loader::{AssetStore, LoadError, SampleBank};

/// Writes an in-memory 16-bit WAV file holding a sine at `frequency` on every
/// channel.
pub fn wav_bytes(channels: u16, sample_rate: u32, frames: usize, frequency: f32) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut buf = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
        for frame in 0..frames {
            let t = frame as f32 / sample_rate as f32;
            let value = (0.5 * (2.0 * PI * frequency * t).sin() * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(value).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    buf
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// A context on a mock device. The clock only moves when the test renders.
pub fn mock_context(sample_rate: u32) -> AudioContext {
    AudioContext::with_device(&mock::Device::get("mock"), sample_rate).unwrap()
}

/// A bank holding a tenth of a second of constant signal for each key.
pub fn test_bank(keys: &[SampleKey]) -> SampleBank {
    let mut bank = SampleBank::default();
    for key in keys {
        bank.insert(*key, DecodedSample::new(vec![0.25; 4410], 1, 44100));
    }
    bank
}

/// Asset store backed by a map, serving WAV bytes.
#[derive(Default)]
pub struct MemoryStore {
    assets: HashMap<SampleKey, Vec<u8>>,
}

impl MemoryStore {
    /// A store holding a short recording at the right pitch for every key.
    pub fn with_keys(keys: &[SampleKey]) -> MemoryStore {
        let tuning = Tuning::default();
        let mut store = MemoryStore::default();
        for key in keys {
            let frequency = tuning.frequency(key.pitch()) as f32;
            store.insert(*key, wav_bytes(1, 8000, 800, frequency));
        }
        store
    }

    pub fn insert(&mut self, key: SampleKey, bytes: Vec<u8>) {
        self.assets.insert(key, bytes);
    }
}

impl AssetStore for MemoryStore {
    fn read(&self, key: &SampleKey) -> Result<Vec<u8>, LoadError> {
        self.assets
            .get(key)
            .cloned()
            .ok_or(LoadError::NotFound(*key))
    }

    fn extension(&self) -> &str {
        "wav"
    }
}
