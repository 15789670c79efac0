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
// Core audio mixing logic shared by the cpal output and the mock device.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use super::automation::{GainParam, SILENCE_FLOOR};
use super::error::SourceError;
use super::generator::Generator;
use super::SourceSender;

/// Global source ID counter.
static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// No stop has been scheduled.
const NO_STOP: u64 = 0;

/// Mixes every active source into the output and owns the audio clock.
pub struct AudioMixer {
    /// Sources currently rendering.
    active_sources: Mutex<Vec<ActiveSource>>,
    /// Sources waiting to join at the next render block.
    pending: Receiver<ActiveSource>,
    sender: SourceSender,
    num_channels: u16,
    sample_rate: u32,
    /// Frames rendered so far. This is the audio clock.
    current_sample: AtomicU64,
    /// Sources released so far.
    released: AtomicU64,
}

/// A source being rendered by the mixer.
pub struct ActiveSource {
    /// Unique ID for this source.
    pub id: u64,
    pub generator: Generator,
    pub gain: GainParam,
    /// Frame at which the source is dropped, or 0 if none is scheduled.
    pub stop_at_sample: Arc<AtomicU64>,
    /// Set once the mixer has released the source.
    pub is_finished: Arc<AtomicBool>,
}

impl ActiveSource {
    /// Wraps a generator and its gain, returning the source and a handle to it.
    pub fn new(generator: Generator, gain: GainParam) -> (ActiveSource, SourceHandle) {
        let id = NEXT_SOURCE_ID.fetch_add(1, Ordering::SeqCst);
        let stop_at_sample = Arc::new(AtomicU64::new(NO_STOP));
        let is_finished = Arc::new(AtomicBool::new(false));
        let handle = SourceHandle {
            id,
            gain: gain.clone(),
            stop_at_sample: stop_at_sample.clone(),
            is_finished: is_finished.clone(),
        };
        (
            ActiveSource {
                id,
                generator,
                gain,
                stop_at_sample,
                is_finished,
            },
            handle,
        )
    }
}

/// Control side of a source owned by the mixer.
#[derive(Clone, Debug)]
pub struct SourceHandle {
    id: u64,
    gain: GainParam,
    stop_at_sample: Arc<AtomicU64>,
    is_finished: Arc<AtomicBool>,
}

impl SourceHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The gain applied to the source.
    pub fn gain(&self) -> &GainParam {
        &self.gain
    }

    /// Returns true once the mixer has released the source.
    pub fn is_finished(&self) -> bool {
        self.is_finished.load(Ordering::Relaxed)
    }

    /// The frame the source will be dropped at, if a stop was scheduled.
    pub fn scheduled_stop(&self) -> Option<u64> {
        match self.stop_at_sample.load(Ordering::Relaxed) {
            NO_STOP => None,
            sample => Some(sample),
        }
    }

    /// Schedules the source to be dropped at the given frame. A source can only
    /// be stopped once.
    pub fn stop_at(&self, sample: u64) -> Result<(), SourceError> {
        if self.is_finished() {
            return Err(SourceError::AlreadyStopped(self.id));
        }
        self.stop_at_sample
            .compare_exchange(NO_STOP, sample.max(1), Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| SourceError::AlreadyStopped(self.id))
    }
}

impl AudioMixer {
    /// Creates a new audio mixer
    pub fn new(num_channels: u16, sample_rate: u32) -> Self {
        let (sender, pending) = crossbeam_channel::unbounded();
        Self {
            active_sources: Mutex::new(Vec::new()),
            pending,
            sender,
            num_channels: num_channels.max(1),
            sample_rate,
            current_sample: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    /// A sender that feeds new sources to this mixer.
    pub fn source_sender(&self) -> SourceSender {
        self.sender.clone()
    }

    /// Mixes the next `out.len() / num_channels` frames into `out`, replacing its
    /// contents, and advances the audio clock.
    pub fn process_into_output(&self, out: &mut [f32]) {
        out.fill(0.0);
        let channels = self.num_channels as usize;
        let frames = out.len() / channels;
        let start = self.current_sample.load(Ordering::SeqCst);
        let sample_rate = self.sample_rate as f64;

        let mut sources = self.active_sources.lock();
        sources.extend(self.pending.try_iter());

        let mut scratch = Vec::new();
        sources.retain_mut(|source| {
            let stop_at = source.stop_at_sample.load(Ordering::SeqCst);
            let timeline = source.gain.lock();
            let source_channels = source.generator.channel_count() as usize;
            scratch.resize(source_channels, 0.0);

            let mut alive = true;
            for frame in 0..frames {
                let sample = start + frame as u64;
                if stop_at != NO_STOP && sample >= stop_at {
                    alive = false;
                    break;
                }
                if !source.generator.next_frame(&mut scratch) {
                    alive = false;
                    break;
                }
                let gain = timeline.value_at(sample as f64 / sample_rate);
                let output = &mut out[frame * channels..(frame + 1) * channels];
                for (channel, value) in output.iter_mut().enumerate() {
                    *value += scratch[channel % source_channels] * gain;
                }
            }

            let end = (start + frames as u64) as f64 / sample_rate;
            if alive && timeline.is_settled(end, SILENCE_FLOOR) {
                alive = false;
            }
            if !alive {
                source.is_finished.store(true, Ordering::SeqCst);
                self.released.fetch_add(1, Ordering::SeqCst);
            }
            alive
        });

        self.current_sample.fetch_add(frames as u64, Ordering::SeqCst);
    }

    /// Processes one frame of audio mixing
    pub fn process_frame(&self) -> Vec<f32> {
        self.process_frames(1)
    }

    /// Processes multiple frames of audio mixing
    pub fn process_frames(&self, num_frames: usize) -> Vec<f32> {
        let mut frames = vec![0.0; num_frames * self.num_channels as usize];
        self.process_into_output(&mut frames);
        frames
    }

    /// Releases every source immediately.
    pub fn clear(&self) {
        let mut sources = self.active_sources.lock();
        sources.extend(self.pending.try_iter());
        for source in sources.drain(..) {
            source.is_finished.store(true, Ordering::SeqCst);
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Gets the number of output channels
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far.
    pub fn current_sample(&self) -> u64 {
        self.current_sample.load(Ordering::SeqCst)
    }

    /// The audio clock in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_sample() as f64 / self.sample_rate as f64
    }

    /// Sources rendering, including ones not yet picked up.
    pub fn active_source_count(&self) -> usize {
        self.active_sources.lock().len() + self.pending.len()
    }

    /// Number of sources released so far.
    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }
}
