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
use std::{fmt, sync::Arc, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tracing::{error, info};

use super::{AudioError, AudioMixer, OutputStream};
use crate::config;

/// Output is rendered in stereo at most.
const MAX_OUTPUT_CHANNELS: u16 = 2;

/// A small wrapper around a cpal::Device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// Stream buffer size in frames.
    buffer_size: u32,
}

impl Device {
    /// Lists cpal devices.
    pub fn list() -> Result<Vec<Device>, AudioError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout().map_err(|e| AudioError::Host(e.to_string()))?;
        let _shh_stderr = shh::stderr().map_err(|e| AudioError::Host(e.to_string()))?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = cpal::host_from_id(host_id).map_err(|e| AudioError::Host(e.to_string()))?;
            let host_devices = match host.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                if let Some(device) = Device::from_cpal(host_id, device) {
                    devices.push(device);
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    fn from_cpal(host_id: cpal::HostId, device: cpal::Device) -> Option<Device> {
        let max_channels = device
            .supported_output_configs()
            .ok()?
            .map(|config| config.channels())
            .max()?;
        if max_channels == 0 {
            return None;
        }

        Some(Device {
            name: device.name().ok()?,
            max_channels,
            host_id,
            device,
            buffer_size: 0,
        })
    }

    /// Gets the configured device. "default" is the default host's default output.
    pub fn get(config: &config::Audio) -> Result<Device, AudioError> {
        let name = config.device();
        let device = if name == "default" {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or(AudioError::NoDefaultDevice)?;
            Device::from_cpal(host.id(), device).ok_or(AudioError::NoDefaultDevice)?
        } else {
            Device::list()?
                .into_iter()
                .find(|device| device.name.trim() == name)
                .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))?
        };

        Ok(Device {
            buffer_size: config.buffer_size(),
            ..device
        })
    }
}

impl super::Device for Device {
    fn channels(&self) -> u16 {
        self.max_channels.min(MAX_OUTPUT_CHANNELS)
    }

    fn start(&self, mixer: Arc<AudioMixer>) -> Result<OutputStream, AudioError> {
        let sample_format = self
            .device
            .default_output_config()
            .map_err(|e| AudioError::Stream(e.to_string()))?
            .sample_format();
        let stream_config = cpal::StreamConfig {
            channels: mixer.num_channels(),
            sample_rate: cpal::SampleRate(mixer.sample_rate()),
            buffer_size: if self.buffer_size > 0 {
                cpal::BufferSize::Fixed(self.buffer_size)
            } else {
                cpal::BufferSize::Default
            },
        };

        let (started_tx, started_rx) = crossbeam_channel::bounded(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let device = self.device.clone();
        let name = self.name.clone();

        // The stream is created and dropped on its own thread since cpal streams
        // are not Send on every platform.
        let thread = thread::spawn(move || {
            let stream = match sample_format {
                cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, mixer),
                cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, mixer),
                cpal::SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, mixer),
                cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, mixer),
                other => Err(AudioError::UnsupportedFormat(other.to_string())),
            }
            .and_then(|stream| {
                stream
                    .play()
                    .map_err(|e| AudioError::Stream(e.to_string()))?;
                Ok(stream)
            });

            match stream {
                Ok(stream) => {
                    info!(
                        device = name,
                        format = sample_format.to_string(),
                        "Output stream started"
                    );
                    let _ = started_tx.send(Ok(()));
                    // Blocks until the sender is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    info!(device = name, "Output stream stopped");
                }
                Err(e) => {
                    let _ = started_tx.send(Err(e));
                }
            }
        });

        match started_rx.recv() {
            Ok(Ok(())) => Ok(OutputStream::new(shutdown_tx, thread)),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioError::Stream("output thread exited early".to_string()))
            }
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Arc<AudioMixer>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                mixer.process_into_output(&mut scratch);
                for (out, sample) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(*sample);
                }
            },
            |err| error!(err = err.to_string(), "Output stream error"),
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}
