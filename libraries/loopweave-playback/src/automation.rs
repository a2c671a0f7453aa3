//! Clip gain automation
//!
//! A [`GainParam`] is a timeline of gain events on the audio clock, in the
//! style of an audio-graph parameter: values are set at instants or ramped
//! linearly towards a target, and the gain at any time is derived from the
//! timeline rather than stepped per buffer. This keeps fades sample-accurate
//! no matter how the host slices rendering.

/// Gain below this is treated as silence
pub const SILENCE: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
enum GainEvent {
    /// Jump to `value` at `time`
    Set { time: f64, value: f32 },
    /// Arrive at `value` at `time`, ramping linearly from the previous event
    Ramp { time: f64, value: f32 },
}

impl GainEvent {
    fn time(&self) -> f64 {
        match self {
            GainEvent::Set { time, .. } | GainEvent::Ramp { time, .. } => *time,
        }
    }

    fn value(&self) -> f32 {
        match self {
            GainEvent::Set { value, .. } | GainEvent::Ramp { value, .. } => *value,
        }
    }
}

/// Automated gain in 0.0-1.0
#[derive(Debug, Clone)]
pub struct GainParam {
    initial: f32,
    events: Vec<GainEvent>,
}

impl GainParam {
    /// Constant gain of `initial` until events say otherwise
    pub fn new(initial: f32) -> Self {
        Self {
            initial: clamp_gain(initial),
            events: Vec::new(),
        }
    }

    /// Jump to `value` at `time`
    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(GainEvent::Set {
            time,
            value: clamp_gain(value),
        });
    }

    /// Ramp linearly from the previous event to `value`, arriving at `end_time`
    ///
    /// With no previous event the ramp starts at time zero from the initial
    /// value.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.insert(GainEvent::Ramp {
            time: end_time,
            value: clamp_gain(value),
        });
    }

    /// Drop every event at or after `time` and hold the value reached there
    ///
    /// A ramp in progress at `time` is truncated so the curve up to `time`
    /// is unchanged.
    pub fn cancel_and_hold_at_time(&mut self, time: f64) {
        let held = self.value_at(time);
        self.events.retain(|e| e.time() < time);
        self.events.push(GainEvent::Ramp { time, value: held });
    }

    /// Ramp from whatever value is reached at `from` to `target` over `duration`
    ///
    /// A non-positive duration steps to `target` at `from`.
    pub fn fade_to(&mut self, target: f32, from: f64, duration: f64) {
        self.cancel_and_hold_at_time(from);
        if duration > 0.0 {
            self.linear_ramp_to_value_at_time(target, from + duration);
        } else {
            self.set_value_at_time(target, from);
        }
    }

    /// Gain at `time`
    pub fn value_at(&self, time: f64) -> f32 {
        let mut value = self.initial;
        let mut since = 0.0_f64;

        for event in &self.events {
            let event_time = event.time();
            if event_time <= time {
                value = event.value();
                since = event_time;
                continue;
            }
            if let GainEvent::Ramp {
                time: end,
                value: target,
            } = *event
            {
                let span = end - since;
                if span > 0.0 && time > since {
                    let fraction = ((time - since) / span) as f32;
                    return clamp_gain(value + (target - value) * fraction);
                }
            }
            return value;
        }

        value
    }

    /// Whether the gain is zero at `time` and stays zero afterwards
    pub fn is_silent_after(&self, time: f64) -> bool {
        self.value_at(time) <= SILENCE
            && self
                .events
                .iter()
                .filter(|e| e.time() > time)
                .all(|e| e.value() <= SILENCE)
    }

    /// Gain once every scheduled event has run
    pub fn final_value(&self) -> f32 {
        self.events.last().map_or(self.initial, GainEvent::value)
    }

    /// Time of the last scheduled event
    pub fn last_event_time(&self) -> Option<f64> {
        self.events.last().map(GainEvent::time)
    }

    fn insert(&mut self, event: GainEvent) {
        let index = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(index, event);
    }
}

impl Default for GainParam {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn clamp_gain(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
