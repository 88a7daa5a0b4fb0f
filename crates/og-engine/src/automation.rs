//! Per-voice parameter timelines and note automation.
//!
//! A `ParamTimeline` is a sorted list of set/ramp events with audio-API
//! semantics: a linear ramp interpolates from the previous event's time and
//! value up to its own. The render path reads it through a forward-only
//! cursor, so evaluation cost stays flat no matter how long a note runs.

use alloc::vec::Vec;
use og_ir::{AutomationPoint, Note};

/// How an event reaches its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RampKind {
    /// Jump to the value at the event time.
    Set,
    /// Ramp linearly from the previous event.
    Linear,
}

/// One scheduled parameter change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamEvent {
    /// Render-clock seconds
    pub time: f64,
    pub value: f32,
    pub kind: RampKind,
}

/// Automated parameter curve.
#[derive(Clone, Debug)]
pub struct ParamTimeline {
    default: f32,
    events: Vec<ParamEvent>,
    /// Events before the cursor are at or before the last sampled time.
    cursor: usize,
}

impl ParamTimeline {
    pub fn new(default: f32) -> Self {
        Self { default, events: Vec::new(), cursor: 0 }
    }

    pub fn events(&self) -> &[ParamEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Step to `value` at `time`.
    pub fn set_value_at(&mut self, time: f64, value: f32) {
        self.insert(ParamEvent { time, value, kind: RampKind::Set });
    }

    /// Ramp linearly from the previous event so `value` is reached at `time`.
    pub fn linear_ramp_to(&mut self, time: f64, value: f32) {
        self.insert(ParamEvent { time, value, kind: RampKind::Linear });
    }

    /// Drop every event after `time`.
    pub fn cancel_after(&mut self, time: f64) {
        let keep = self.events.partition_point(|e| e.time <= time);
        self.events.truncate(keep);
        self.cursor = self.cursor.min(keep);
    }

    /// Drop every event after `time` and pin the curve to the value it has
    /// there, truncating any ramp in progress.
    pub fn hold_at(&mut self, time: f64) {
        let held = self.value_at(time);
        let keep = self.events.partition_point(|e| e.time <= time);
        self.events.truncate(keep);
        self.cursor = self.cursor.min(keep);
        self.insert(ParamEvent { time, value: held, kind: RampKind::Linear });
    }

    /// Curve value at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let idx = self.events.partition_point(|e| e.time <= time);
        self.evaluate(idx, time)
    }

    /// Curve value at `time` for monotonically increasing `time`.
    pub fn sample(&mut self, time: f64) -> f32 {
        while self.cursor < self.events.len() && self.events[self.cursor].time <= time {
            self.cursor += 1;
        }
        self.evaluate(self.cursor, time)
    }

    /// Value the curve settles on after its last event.
    pub fn final_value(&self) -> f32 {
        self.events.last().map_or(self.default, |e| e.value)
    }

    /// `idx` is the number of events at or before `time`.
    fn evaluate(&self, idx: usize, time: f64) -> f32 {
        let (from_time, from_value) = match idx.checked_sub(1).map(|i| &self.events[i]) {
            Some(prev) => (prev.time, prev.value),
            None => (0.0, self.default),
        };
        match self.events.get(idx) {
            Some(next) if next.kind == RampKind::Linear => {
                let span = next.time - from_time;
                if span <= 0.0 {
                    return next.value;
                }
                let t = ((time - from_time) / span).clamp(0.0, 1.0) as f32;
                from_value + (next.value - from_value) * t
            }
            _ => from_value,
        }
    }

    fn insert(&mut self, event: ParamEvent) {
        if !event.time.is_finite() {
            return;
        }
        // equal times keep insertion order
        let pos = self.events.partition_point(|e| e.time <= event.time);
        if pos < self.cursor {
            self.cursor += 1;
        }
        self.events.insert(pos, event);
    }
}

/// Gain for a 0-127 velocity: `10^(((v * 2 - 255) * 8) / 2000)`.
pub fn gain_for_velocity(velocity: i32) -> f32 {
    let v = velocity.clamp(0, 127);
    let exponent = ((v * 2 - 255) * 8) as f64 / 2000.0;
    libm::pow(10.0, exponent) as f32
}

/// Pan lane value for a -100..100 position.
pub fn pan_position(pan: i32) -> f32 {
    pan.clamp(-100, 100) as f32 / 100.0
}

/// Maps a note's tick-indexed breakpoints onto a voice's timelines.
#[derive(Clone, Copy, Debug)]
pub struct AutomationEngine {
    seconds_per_tick: f64,
}

impl AutomationEngine {
    pub fn new(seconds_per_tick: f64) -> Self {
        Self { seconds_per_tick }
    }

    /// Program both lanes of `note`, which starts at `start` seconds.
    pub fn apply(
        &self,
        note: &Note,
        start: f64,
        gain: &mut ParamTimeline,
        pan: &mut ParamTimeline,
    ) {
        self.apply_volume(gain, &note.volume_automation, start);
        self.apply_pan(pan, &note.pan_automation, start);
    }

    /// The first point is approached by a ramp from the current gain; later
    /// points step.
    pub fn apply_volume(&self, gain: &mut ParamTimeline, points: &[AutomationPoint], start: f64) {
        let points = sorted(points);
        let mut iter = points.iter();
        let Some(first) = iter.next() else { return };
        let first_time = self.time_of(first, start);
        // an attack still running at the first point is superseded
        gain.cancel_after(first_time);
        gain.linear_ramp_to(first_time, gain_for_velocity(first.value as i32));
        for point in iter {
            gain.set_value_at(self.time_of(point, start), gain_for_velocity(point.value as i32));
        }
    }

    /// The first point steps; later points ramp from the previous one.
    pub fn apply_pan(&self, pan: &mut ParamTimeline, points: &[AutomationPoint], start: f64) {
        let points = sorted(points);
        let mut iter = points.iter();
        let Some(first) = iter.next() else { return };
        pan.set_value_at(self.time_of(first, start), pan_position(first.value as i32));
        for point in iter {
            pan.linear_ramp_to(self.time_of(point, start), pan_position(point.value as i32));
        }
    }

    fn time_of(&self, point: &AutomationPoint, start: f64) -> f64 {
        start + point.tick as f64 * self.seconds_per_tick
    }
}

fn sorted(points: &[AutomationPoint]) -> Vec<AutomationPoint> {
    let mut points = points.to_vec();
    points.sort_by_key(|p| p.tick);
    points
}
