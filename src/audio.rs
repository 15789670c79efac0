// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
use std::{fmt, sync::Arc, thread::JoinHandle};

use crate::config;

pub mod automation;
pub mod context;
pub mod cpal;
pub mod decode;
pub mod error;
pub mod generator;
pub mod mixer;
pub mod mock;

pub use context::AudioContext;
pub use error::AudioError;
pub use mixer::AudioMixer;

/// Sender used to hand new sources to the mixer.
pub type SourceSender = crossbeam_channel::Sender<mixer::ActiveSource>;

/// An output device that pulls audio from a mixer.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// The number of output channels the mixer should render.
    fn channels(&self) -> u16;

    /// Starts pulling audio from the mixer. Audio flows until the returned
    /// stream is shut down or dropped.
    fn start(&self, mixer: Arc<AudioMixer>) -> Result<OutputStream, AudioError>;
}

/// A running output. Owns the thread that keeps the device stream alive.
pub struct OutputStream {
    shutdown: Option<crossbeam_channel::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl OutputStream {
    /// Wraps a stream thread that exits once `shutdown` is dropped.
    pub fn new(shutdown: crossbeam_channel::Sender<()>, thread: JoinHandle<()>) -> OutputStream {
        OutputStream {
            shutdown: Some(shutdown),
            thread: Some(thread),
        }
    }

    /// A stream with no backing thread.
    pub fn detached() -> OutputStream {
        OutputStream {
            shutdown: None,
            thread: None,
        }
    }

    /// Stops the stream and waits for its thread to exit.
    pub fn shutdown(&mut self) {
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, AudioError> {
    Ok(cpal::Device::list()?
        .into_iter()
        .map(|device| {
            let device: Box<dyn Device> = Box::new(device);
            device
        })
        .collect())
}

/// Gets the device named by the configuration.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, AudioError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
