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
/// Errors raised while opening or driving the audio output.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio device found with name {0}")]
    DeviceNotFound(String),

    #[error("no default output device available")]
    NoDefaultDevice,

    #[error("unsupported output sample format {0}")]
    UnsupportedFormat(String),

    #[error("audio host error: {0}")]
    Host(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("unusable output sample rate {0}")]
    InvalidSampleRate(u32),

    #[error("audio context is closed")]
    Closed,
}

/// Errors raised while decoding asset bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("decoding failed: {0}")]
    Symphonia(#[from] symphonia::core::errors::Error),

    #[error("no audio track found")]
    NoTrack,

    #[error("sample rate not specified")]
    NoSampleRate,

    #[error("decoded audio contains no frames")]
    Empty,
}

/// Errors raised by a running source.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("source {0} is already stopped")]
    AlreadyStopped(u64),
}

/// Errors raised while building a sound generator.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeneratorError {
    #[error("invalid frequency {0} Hz")]
    InvalidFrequency(f64),

    #[error("invalid playback rate {0}")]
    InvalidPlaybackRate(f64),

    #[error("sample has no frames")]
    EmptySample,
}
