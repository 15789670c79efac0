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
use std::{fmt, sync::Arc};

use tracing::info;

use super::{AudioError, AudioMixer, OutputStream};

const MOCK_CHANNELS: u16 = 2;

/// A mock device. Doesn't actually play anything; the audio clock only moves
/// when the owner renders frames from the mixer.
#[derive(Clone)]
pub struct Device {
    name: String,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
        }
    }
}

impl super::Device for Device {
    fn channels(&self) -> u16 {
        MOCK_CHANNELS
    }

    fn start(&self, mixer: Arc<AudioMixer>) -> Result<OutputStream, AudioError> {
        info!(
            device = self.name,
            channels = mixer.num_channels(),
            sample_rate = mixer.sample_rate(),
            "Started mock output."
        );
        Ok(OutputStream::detached())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
