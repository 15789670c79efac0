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
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::error::DecodeError;

/// A fully decoded waveform held in memory as interleaved f32 samples.
#[derive(Clone, Debug)]
pub struct DecodedSample {
    data: Arc<Vec<f32>>,
    channel_count: u16,
    sample_rate: u32,
}

impl DecodedSample {
    /// Wraps interleaved samples.
    pub fn new(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> DecodedSample {
        DecodedSample {
            data: Arc::new(data),
            channel_count: channel_count.max(1),
            sample_rate,
        }
    }

    /// The interleaved sample data.
    pub fn data(&self) -> &Arc<Vec<f32>> {
        &self.data
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.data.len() / self.channel_count as usize
    }

    /// Playing time at the native rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Memory held by the sample data in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Decodes a complete in-memory asset. `extension` is used as a format hint.
pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedSample, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::NoSampleRate)?;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut sample_buffer: Option<SampleBuffer<f32>> = None;
    let mut data = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt packets are skipped.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        if channels == 0 {
            channels = decoded.spec().channels.count() as u16;
        }

        let needed = decoded.capacity() * decoded.spec().channels.count();
        if sample_buffer.as_ref().map_or(true, |b| b.capacity() < needed) {
            sample_buffer = Some(SampleBuffer::<f32>::new(
                decoded.capacity() as u64,
                *decoded.spec(),
            ));
        }
        if let Some(buffer) = sample_buffer.as_mut() {
            buffer.copy_interleaved_ref(decoded);
            data.extend_from_slice(buffer.samples());
        }
    }

    if data.is_empty() || channels == 0 {
        return Err(DecodeError::Empty);
    }

    Ok(DecodedSample::new(data, channels, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::wav_bytes;

    #[test]
    fn test_decode_mono_wav() {
        let bytes = wav_bytes(1, 44100, 4410, 440.0);
        let sample = decode(bytes, Some("wav")).unwrap();
        assert_eq!(sample.channel_count(), 1);
        assert_eq!(sample.sample_rate(), 44100);
        assert_eq!(sample.frames(), 4410);
        assert_eq!(sample.duration(), Duration::from_millis(100));
        assert_eq!(sample.memory_size(), 4410 * 4);
        assert!(sample.data().iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn test_decode_stereo_wav() {
        let bytes = wav_bytes(2, 22050, 100, 220.0);
        let sample = decode(bytes, Some("wav")).unwrap();
        assert_eq!(sample.channel_count(), 2);
        assert_eq!(sample.frames(), 100);
        assert_eq!(sample.data().len(), 200);
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode(b"definitely not audio".to_vec(), Some("mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_empty_wav() {
        let bytes = wav_bytes(1, 44100, 0, 440.0);
        assert!(decode(bytes, Some("wav")).is_err());
    }
}
