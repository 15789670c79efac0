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

//! Gain automation on the audio clock.
//!
//! A [`GainParam`] holds a timeline of scheduled changes: instant sets, linear
//! ramps and exponential ramps. Control code schedules changes ahead of time and
//! the mixer samples the timeline once per rendered frame. A ramp starts where
//! the event before it ends.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// Near-silence target used for exponential fades. Exponential ramps cannot
/// reach zero.
pub const SILENCE_FLOOR: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Ramp {
    Set,
    Linear,
    Exponential,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Event {
    time: f64,
    value: f32,
    ramp: Ramp,
}

/// The scheduled values of a single gain.
#[derive(Debug)]
pub struct Timeline {
    initial: f32,
    events: Vec<Event>,
}

impl Timeline {
    fn new(initial: f32) -> Timeline {
        Timeline {
            initial,
            events: Vec::new(),
        }
    }

    fn insert(&mut self, event: Event) {
        let index = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(index, event);
    }

    /// The value of the gain at the given time in seconds.
    pub fn value_at(&self, time: f64) -> f32 {
        let index = self.events.partition_point(|e| e.time <= time);
        let (start_time, start_value) = match index.checked_sub(1) {
            Some(prev) => (self.events[prev].time, self.events[prev].value),
            None => (0.0, self.initial),
        };

        let Some(next) = self.events.get(index) else {
            return start_value;
        };

        let span = next.time - start_time;
        if span <= 0.0 {
            return start_value;
        }
        let progress = ((time - start_time) / span).clamp(0.0, 1.0) as f32;

        match next.ramp {
            Ramp::Set => start_value,
            Ramp::Linear => start_value + (next.value - start_value) * progress,
            Ramp::Exponential => {
                if start_value <= 0.0 || next.value <= 0.0 {
                    start_value
                } else {
                    start_value * (next.value / start_value).powf(progress)
                }
            }
        }
    }

    /// Removes every event at or after the given time.
    pub fn cancel_from(&mut self, time: f64) {
        let index = self.events.partition_point(|e| e.time < time);
        self.events.truncate(index);
    }

    /// Time of the last scheduled event, if any.
    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(|e| e.time)
    }

    /// True once every scheduled change has happened and the gain rests at or
    /// below the floor.
    pub fn is_settled(&self, time: f64, floor: f32) -> bool {
        match self.end_time() {
            Some(end) => time >= end && self.value_at(time) <= floor,
            None => self.initial <= floor,
        }
    }
}

/// A shareable, schedulable gain.
#[derive(Clone, Debug)]
pub struct GainParam {
    timeline: Arc<Mutex<Timeline>>,
}

impl GainParam {
    /// Creates a gain that holds `initial` until something is scheduled.
    pub fn new(initial: f32) -> GainParam {
        GainParam {
            timeline: Arc::new(Mutex::new(Timeline::new(initial))),
        }
    }

    /// Jumps to the value at the given time.
    pub fn set_value_at_time(&self, value: f32, time: f64) {
        self.timeline.lock().insert(Event {
            time,
            value,
            ramp: Ramp::Set,
        });
    }

    /// Ramps linearly from the previous event to the value at the given time.
    pub fn linear_ramp_to_value_at_time(&self, value: f32, time: f64) {
        self.timeline.lock().insert(Event {
            time,
            value,
            ramp: Ramp::Linear,
        });
    }

    /// Ramps exponentially from the previous event to the value at the given
    /// time. Both ends must be positive for the ramp to move.
    pub fn exponential_ramp_to_value_at_time(&self, value: f32, time: f64) {
        self.timeline.lock().insert(Event {
            time,
            value,
            ramp: Ramp::Exponential,
        });
    }

    /// Cancels every change scheduled at or after the given time.
    pub fn cancel_scheduled_values(&self, time: f64) {
        self.timeline.lock().cancel_from(time);
    }

    /// The value of the gain at the given time.
    pub fn value_at(&self, time: f64) -> f32 {
        self.timeline.lock().value_at(time)
    }

    /// Pins the gain to whatever it is sounding at `time`, dropping everything
    /// scheduled from then on. Returns the pinned value.
    pub fn hold_at(&self, time: f64) -> f32 {
        let mut timeline = self.timeline.lock();
        let value = timeline.value_at(time);
        timeline.cancel_from(time);
        timeline.insert(Event {
            time,
            value,
            ramp: Ramp::Set,
        });
        value
    }

    /// Locks the timeline so a whole render block can be sampled at once.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Timeline> {
        self.timeline.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_initial_value() {
        let gain = GainParam::new(0.5);
        assert_close(gain.value_at(0.0), 0.5);
        assert_close(gain.value_at(100.0), 0.5);
    }

    #[test]
    fn test_set_value() {
        let gain = GainParam::new(1.0);
        gain.set_value_at_time(0.25, 1.0);
        assert_close(gain.value_at(0.5), 1.0);
        assert_close(gain.value_at(1.0), 0.25);
        assert_close(gain.value_at(2.0), 0.25);
    }

    #[test]
    fn test_linear_ramp() {
        let gain = GainParam::new(0.0);
        gain.set_value_at_time(0.0, 1.0);
        gain.linear_ramp_to_value_at_time(1.0, 2.0);
        assert_close(gain.value_at(1.0), 0.0);
        assert_close(gain.value_at(1.5), 0.5);
        assert_close(gain.value_at(2.0), 1.0);
        assert_close(gain.value_at(3.0), 1.0);
    }

    #[test]
    fn test_exponential_ramp() {
        let gain = GainParam::new(0.0);
        gain.set_value_at_time(1.0, 0.0);
        gain.exponential_ramp_to_value_at_time(0.01, 2.0);
        assert_close(gain.value_at(1.0), 0.1);
        assert_close(gain.value_at(2.0), 0.01);
    }

    #[test]
    fn test_exponential_ramp_from_zero_holds() {
        let gain = GainParam::new(0.0);
        gain.set_value_at_time(0.0, 0.0);
        gain.exponential_ramp_to_value_at_time(1.0, 1.0);
        assert_close(gain.value_at(0.5), 0.0);
        assert_close(gain.value_at(1.0), 1.0);
    }

    #[test]
    fn test_events_kept_in_time_order() {
        let gain = GainParam::new(0.0);
        gain.linear_ramp_to_value_at_time(1.0, 2.0);
        gain.set_value_at_time(0.0, 1.0);
        assert_close(gain.value_at(1.5), 0.5);
    }

    #[test]
    fn test_hold_at_pins_current_value() {
        let gain = GainParam::new(0.0);
        gain.set_value_at_time(0.0, 0.0);
        gain.linear_ramp_to_value_at_time(1.0, 1.0);
        gain.linear_ramp_to_value_at_time(0.0, 2.0);

        let held = gain.hold_at(0.5);
        assert_close(held, 0.5);
        assert_close(gain.value_at(0.75), 0.5);
        assert_close(gain.value_at(5.0), 0.5);
        assert_eq!(gain.lock().end_time(), Some(0.5));
    }

    #[test]
    fn test_cancel_scheduled_values() {
        let gain = GainParam::new(0.0);
        gain.set_value_at_time(0.3, 0.0);
        gain.linear_ramp_to_value_at_time(1.0, 1.0);
        gain.cancel_scheduled_values(1.0);
        assert_close(gain.value_at(2.0), 0.3);
    }

    #[test]
    fn test_is_settled() {
        let gain = GainParam::new(0.0);
        gain.set_value_at_time(1.0, 0.0);
        gain.exponential_ramp_to_value_at_time(SILENCE_FLOOR, 1.0);

        let timeline = gain.lock();
        assert!(!timeline.is_settled(0.5, SILENCE_FLOOR));
        assert!(timeline.is_settled(1.0, SILENCE_FLOOR));
        assert!(timeline.is_settled(3.0, SILENCE_FLOOR));
    }

    #[test]
    fn test_unscheduled_gain_settles_only_when_silent() {
        assert!(GainParam::new(0.0).lock().is_settled(0.0, SILENCE_FLOOR));
        assert!(!GainParam::new(1.0).lock().is_settled(10.0, SILENCE_FLOOR));
    }
}
