//! The note record consumed by the scheduler.

use alloc::vec::Vec;

use crate::instrument::InstrumentId;
use crate::timing::Timing;

/// Keys per octave in the 72-EDO grid.
pub const KEYS_PER_OCTAVE: u16 = 72;

/// Keys per conventional semitone.
pub const KEYS_PER_SEMITONE: u16 = 6;

/// Number of octaves addressable by a key.
pub const OCTAVES: u16 = 8;

/// Total number of keys (8 octaves x 72 steps).
pub const KEY_COUNT: usize = (KEYS_PER_OCTAVE * OCTAVES) as usize;

/// Highest valid key index.
pub const MAX_KEY: u16 = KEY_COUNT as u16 - 1;

/// Clamp any integer key into `0..=MAX_KEY`.
pub fn clamp_key(key: i32) -> u16 {
    key.clamp(0, MAX_KEY as i32) as u16
}

/// How a melodic voice loops its waveform ("pipi").
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopPolicy {
    /// Loop until the note ends or is stopped.
    #[default]
    Infinite,
    /// Loop an octave-scaled number of cycles, then stop by itself.
    FiniteRepeats(u8),
}

/// One automation breakpoint, tick-indexed relative to the note start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutomationPoint {
    /// Ticks after the note start
    pub tick: u32,
    /// Velocity scale (0-127) for volume lanes, -100..100 for pan lanes
    pub value: i16,
}

impl AutomationPoint {
    pub const fn new(tick: u32, value: i16) -> Self {
        Self { tick, value }
    }
}

/// A note in the canonical stream produced by importers and the editor.
///
/// Fields are validated once by the constructors; the engine never mutates
/// a note after it has been handed over.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    /// 72-EDO key, 0..=575
    pub key: u16,
    /// 0-127
    pub velocity: u8,
    /// -100 (left) to 100 (right)
    pub pan: i8,
    pub instrument: InstrumentId,
    /// Absolute start position in ticks from song start
    pub start_tick: u64,
    /// Length in ticks
    pub duration_ticks: u32,
    pub loop_policy: LoopPolicy,
    /// Volume breakpoints, sorted by tick
    pub volume_automation: Vec<AutomationPoint>,
    /// Pan breakpoints, sorted by tick
    pub pan_automation: Vec<AutomationPoint>,
}

impl Note {
    /// Default velocity for notes that don't specify one.
    pub const DEFAULT_VELOCITY: u8 = 100;

    /// Create a note; the key is clamped into range.
    pub fn new(key: i32, instrument: InstrumentId, start_tick: u64, duration_ticks: u32) -> Self {
        Self {
            key: clamp_key(key),
            velocity: Self::DEFAULT_VELOCITY,
            pan: 0,
            instrument,
            start_tick,
            duration_ticks,
            loop_policy: LoopPolicy::Infinite,
            volume_automation: Vec::new(),
            pan_automation: Vec::new(),
        }
    }

    pub fn with_velocity(mut self, velocity: i32) -> Self {
        self.velocity = velocity.clamp(0, 127) as u8;
        self
    }

    pub fn with_pan(mut self, pan: i32) -> Self {
        self.pan = pan.clamp(-100, 100) as i8;
        self
    }

    pub fn with_loop_policy(mut self, policy: LoopPolicy) -> Self {
        self.loop_policy = policy;
        self
    }

    /// Attach volume breakpoints `(tick, velocity)`; sorted and clamped to 0-127.
    pub fn with_volume_automation(mut self, points: impl IntoIterator<Item = (u32, i32)>) -> Self {
        self.volume_automation = collect_points(points, 0, 127);
        self
    }

    /// Attach pan breakpoints `(tick, pan)`; sorted and clamped to -100..100.
    pub fn with_pan_automation(mut self, points: impl IntoIterator<Item = (u32, i32)>) -> Self {
        self.pan_automation = collect_points(points, -100, 100);
        self
    }

    /// First tick after the note.
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration_ticks as u64
    }

    /// Measure containing the note start.
    pub fn measure(&self, timing: &Timing) -> u32 {
        timing.measure_of(self.start_tick)
    }

    /// Note length in seconds at the given tempo.
    pub fn duration_seconds(&self, timing: &Timing) -> f64 {
        self.duration_ticks as f64 * timing.seconds_per_tick()
    }
}

fn collect_points(
    points: impl IntoIterator<Item = (u32, i32)>,
    min: i32,
    max: i32,
) -> Vec<AutomationPoint> {
    let mut out: Vec<AutomationPoint> = points
        .into_iter()
        .map(|(tick, value)| AutomationPoint::new(tick, value.clamp(min, max) as i16))
        .collect();
    out.sort_by_key(|p| p.tick);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_out_of_range_is_clamped() {
        assert_eq!(Note::new(-5, InstrumentId::Melodic(0), 0, 1).key, 0);
        assert_eq!(Note::new(900, InstrumentId::Melodic(0), 0, 1).key, MAX_KEY);
        assert_eq!(clamp_key(300), 300);
    }

    #[test]
    fn builders_clamp_velocity_and_pan() {
        let note = Note::new(100, InstrumentId::Melodic(3), 0, 48)
            .with_velocity(500)
            .with_pan(-300);
        assert_eq!(note.velocity, 127);
        assert_eq!(note.pan, -100);
    }

    #[test]
    fn automation_is_sorted_by_tick() {
        let note = Note::new(100, InstrumentId::Melodic(0), 0, 96)
            .with_volume_automation([(48, 10), (0, 127), (24, 200)]);
        let ticks: Vec<u32> = note.volume_automation.iter().map(|p| p.tick).collect();
        assert_eq!(ticks, [0, 24, 48]);
        assert_eq!(note.volume_automation[1].value, 127);
    }

    #[test]
    fn duration_seconds_follows_tempo() {
        let timing = Timing::default(); // 120 BPM, 48 ticks per beat
        let note = Note::new(0, InstrumentId::Melodic(0), 0, 96);
        assert!((note.duration_seconds(&timing) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn measure_of_start() {
        let timing = Timing::default(); // 192 ticks per measure
        let note = Note::new(0, InstrumentId::Melodic(0), 192 * 3 + 5, 1);
        assert_eq!(note.measure(&timing), 3);
        assert_eq!(note.end_tick(), 192 * 3 + 6);
    }
}
