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

//! Concurrent loading of the sample catalog.
//!
//! Every sample is fetched and decoded on its own blocking task. Failures are
//! logged and skipped; the batch always completes and yields whatever loaded.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::catalog::{SampleKey, DEFAULT_EXTENSION};
use crate::audio::decode::{self, DecodedSample};
use crate::audio::error::DecodeError;

/// Errors raised while loading a single sample.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("sample {0} is not available")]
    NotFound(SampleKey),

    #[error("failed to decode {key}: {source}")]
    Decode { key: SampleKey, source: DecodeError },

    #[error("load task failed: {0}")]
    Task(String),
}

/// Where sample bytes come from.
pub trait AssetStore: Send + Sync {
    /// Reads the raw bytes of a sample.
    fn read(&self, key: &SampleKey) -> Result<Vec<u8>, LoadError>;

    /// The extension of the stored assets, used as a decoding hint.
    fn extension(&self) -> &str;
}

/// Reads samples from a directory of `{ClassToken}{Octave}v10.{ext}` files.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    base_path: PathBuf,
    extension: String,
}

impl DirectoryStore {
    pub fn new(base_path: &Path, extension: &str) -> DirectoryStore {
        DirectoryStore {
            base_path: base_path.to_path_buf(),
            extension: extension.to_string(),
        }
    }

    /// The file a sample is read from.
    pub fn path_for(&self, key: &SampleKey) -> PathBuf {
        self.base_path.join(key.file_name(&self.extension))
    }
}

impl Default for DirectoryStore {
    fn default() -> Self {
        DirectoryStore::new(Path::new("."), DEFAULT_EXTENSION)
    }
}

impl AssetStore for DirectoryStore {
    fn read(&self, key: &SampleKey) -> Result<Vec<u8>, LoadError> {
        let path = self.path_for(key);
        fs::read(&path).map_err(|source| LoadError::Io { path, source })
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}

/// The samples that actually loaded.
#[derive(Clone, Default)]
pub struct SampleBank {
    samples: HashMap<SampleKey, DecodedSample>,
    /// Loaded keys in catalog declaration order.
    keys: Vec<SampleKey>,
}

impl SampleBank {
    /// Adds a sample, replacing any previous one for the key.
    pub fn insert(&mut self, key: SampleKey, sample: DecodedSample) {
        if self.samples.insert(key, sample).is_none() {
            self.keys.push(key);
            self.keys.sort_by_key(|key| key.declaration_rank());
        }
    }

    pub fn get(&self, key: &SampleKey) -> Option<&DecodedSample> {
        self.samples.get(key)
    }

    pub fn contains(&self, key: &SampleKey) -> bool {
        self.samples.contains_key(key)
    }

    /// Loaded keys in catalog declaration order.
    pub fn keys(&self) -> &[SampleKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the total memory used by loaded samples.
    pub fn total_memory_usage(&self) -> usize {
        self.samples.values().map(|s| s.memory_size()).sum()
    }
}

impl std::fmt::Debug for SampleBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBank")
            .field("loaded_samples", &self.keys.len())
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Percentage of `total` that `loaded` represents, rounded down.
pub fn progress_percent(loaded: usize, total: usize) -> u8 {
    (loaded.min(total) * 100 / total.max(1)) as u8
}

/// Loads samples from an asset store.
pub struct SampleLoader {
    store: Arc<dyn AssetStore>,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    /// Loads and decodes a single sample.
    pub fn load(&self, key: SampleKey) -> Result<DecodedSample, LoadError> {
        load_one(self.store.as_ref(), key)
    }

    /// Loads every key concurrently and waits for all of them to settle.
    /// `on_progress` receives the percentage of keys loaded so far, once per
    /// successful load, in completion order.
    pub async fn load_all<F>(&self, keys: &[SampleKey], mut on_progress: F) -> SampleBank
    where
        F: FnMut(u8),
    {
        let total = keys.len();
        info!(total, extension = self.store.extension(), "Loading samples");

        let mut tasks = JoinSet::new();
        for key in keys.iter().copied() {
            let store = self.store.clone();
            tasks.spawn_blocking(move || (key, load_one(store.as_ref(), key)));
        }

        let mut bank = SampleBank::default();
        let mut loaded = 0;
        while let Some(joined) = tasks.join_next().await {
            let (key, result) = match joined {
                Ok(completed) => completed,
                Err(e) => {
                    let err = LoadError::Task(e.to_string());
                    warn!(err = %err, "Sample load task failed");
                    continue;
                }
            };

            match result {
                Ok(sample) => {
                    debug!(
                        sample = %key,
                        channels = sample.channel_count(),
                        sample_rate = sample.sample_rate(),
                        duration_ms = sample.duration().as_millis(),
                        memory_kb = sample.memory_size() / 1024,
                        "Sample loaded"
                    );
                    bank.insert(key, sample);
                    loaded += 1;
                    on_progress(progress_percent(loaded, total));
                }
                Err(e) => warn!(sample = %key, err = %e, "Failed to load sample"),
            }
        }

        if loaded > 0 {
            info!(
                loaded,
                total,
                memory_kb = bank.total_memory_usage() / 1024,
                "Samples loaded"
            );
        } else if total > 0 {
            error!(total, "Failed to load any samples");
        }

        bank
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("extension", &self.store.extension())
            .finish()
    }
}

fn load_one(store: &dyn AssetStore, key: SampleKey) -> Result<DecodedSample, LoadError> {
    let bytes = store.read(&key)?;
    decode::decode(bytes, Some(store.extension()))
        .map_err(|source| LoadError::Decode { key, source })
}
