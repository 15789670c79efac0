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
// Sound generators rendered by the mixer: a one-shot buffer player and
// free-running oscillators.
use std::f64::consts::TAU;

use super::decode::DecodedSample;
use super::error::GeneratorError;

/// Oscillator wave shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

impl Waveform {
    /// Amplitude at a phase in [0, 1).
    fn sample(self, phase: f64) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin() as f32,
            Waveform::Triangle => (1.0 - 4.0 * ((phase + 0.25).fract() - 0.5).abs()) as f32,
        }
    }
}

/// A free-running mono oscillator. Never exhausts on its own.
#[derive(Debug)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f64,
    phase: f64,
    increment: f64,
}

impl Oscillator {
    /// Creates an oscillator at `frequency` Hz for the given output rate.
    pub fn new(
        waveform: Waveform,
        frequency: f64,
        sample_rate: u32,
    ) -> Result<Oscillator, GeneratorError> {
        if !frequency.is_finite() || frequency <= 0.0 || sample_rate == 0 {
            return Err(GeneratorError::InvalidFrequency(frequency));
        }
        Ok(Oscillator {
            waveform,
            frequency,
            phase: 0.0,
            increment: frequency / sample_rate as f64,
        })
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    fn next_sample(&mut self) -> f32 {
        let sample = self.waveform.sample(self.phase);
        self.phase = (self.phase + self.increment).fract();
        sample
    }
}

/// Plays a decoded sample once at a fixed playback rate.
#[derive(Debug)]
pub struct BufferPlayer {
    sample: DecodedSample,
    playback_rate: f64,
    position: f64,
    step: f64,
}

impl BufferPlayer {
    /// Creates a player. A playback rate of 2.0 plays an octave up.
    pub fn new(
        sample: DecodedSample,
        playback_rate: f64,
        output_rate: u32,
    ) -> Result<BufferPlayer, GeneratorError> {
        if sample.frames() == 0 {
            return Err(GeneratorError::EmptySample);
        }
        let step = playback_rate * sample.sample_rate() as f64 / output_rate as f64;
        if !step.is_finite() || step <= 0.0 {
            return Err(GeneratorError::InvalidPlaybackRate(playback_rate));
        }
        Ok(BufferPlayer {
            sample,
            playback_rate,
            position: 0.0,
            step,
        })
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn sample(&self) -> &DecodedSample {
        &self.sample
    }

    fn next_frame(&mut self, out: &mut [f32]) -> bool {
        let frames = self.sample.frames();
        let index = self.position as usize;
        if index >= frames {
            return false;
        }

        let channels = self.sample.channel_count() as usize;
        let data = self.sample.data();
        let fraction = (self.position - index as f64) as f32;
        let next = (index + 1).min(frames - 1);
        for (channel, value) in out.iter_mut().enumerate().take(channels) {
            let a = data[index * channels + channel];
            let b = data[next * channels + channel];
            *value = a + (b - a) * fraction;
        }

        self.position += self.step;
        true
    }
}

/// Anything the mixer can render.
#[derive(Debug)]
pub enum Generator {
    Buffer(BufferPlayer),
    Oscillator(Oscillator),
}

impl Generator {
    pub fn channel_count(&self) -> u16 {
        match self {
            Generator::Buffer(player) => player.sample.channel_count(),
            Generator::Oscillator(_) => 1,
        }
    }

    /// Writes the next frame into `out`, which must hold `channel_count()`
    /// samples. Returns false once the generator is exhausted.
    pub fn next_frame(&mut self, out: &mut [f32]) -> bool {
        match self {
            Generator::Buffer(player) => player.next_frame(out),
            Generator::Oscillator(oscillator) => {
                let sample = oscillator.next_sample();
                out.fill(sample);
                true
            }
        }
    }
}
