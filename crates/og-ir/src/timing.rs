//! Tempo, measure arithmetic and the loop window.
//!
//! Notes are positioned in ticks. A measure is `beats_per_measure` beats of
//! `ticks_per_beat` ticks; converting to seconds always goes through the
//! current tempo so a tempo change rescales everything not yet scheduled.

/// Lowest tempo accepted by `set_bpm`.
pub const MIN_BPM: f64 = 10.0;
/// Highest tempo accepted by `set_bpm`.
pub const MAX_BPM: f64 = 999.0;

/// Tempo and meter of a song.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    /// Beats per minute
    pub bpm: f64,
    /// Beats in one measure (4 for 4/4)
    pub beats_per_measure: u32,
    /// Tick resolution of one beat
    pub ticks_per_beat: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self { bpm: 120.0, beats_per_measure: 4, ticks_per_beat: 48 }
    }
}

impl Timing {
    pub fn new(bpm: f64, beats_per_measure: u32, ticks_per_beat: u32) -> Self {
        let mut timing = Self {
            bpm: 120.0,
            beats_per_measure: beats_per_measure.max(1),
            ticks_per_beat: ticks_per_beat.max(1),
        };
        timing.set_bpm(bpm);
        timing
    }

    /// Set the tempo, clamped to `MIN_BPM..=MAX_BPM`. Non-finite values are ignored.
    pub fn set_bpm(&mut self, bpm: f64) {
        if bpm.is_finite() {
            self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        }
    }

    pub fn ticks_per_measure(&self) -> u64 {
        self.beats_per_measure as u64 * self.ticks_per_beat as u64
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn seconds_per_tick(&self) -> f64 {
        self.seconds_per_beat() / self.ticks_per_beat as f64
    }

    pub fn seconds_per_measure(&self) -> f64 {
        self.seconds_per_beat() * self.beats_per_measure as f64
    }

    /// Measure containing `tick`.
    pub fn measure_of(&self, tick: u64) -> u32 {
        (tick / self.ticks_per_measure()) as u32
    }

    /// First tick of `measure`.
    pub fn measure_start_tick(&self, measure: u32) -> u64 {
        measure as u64 * self.ticks_per_measure()
    }
}

/// Measure range the transport wraps around while looping.
///
/// Invariant: `start_measure < end_measure`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopWindow {
    pub enabled: bool,
    pub start_measure: u32,
    pub end_measure: u32,
}

impl Default for LoopWindow {
    fn default() -> Self {
        Self { enabled: false, start_measure: 0, end_measure: 4 }
    }
}

impl LoopWindow {
    /// Build a window; `None` if the range is empty or inverted.
    pub fn new(enabled: bool, start_measure: u32, end_measure: u32) -> Option<Self> {
        if start_measure >= end_measure {
            return None;
        }
        Some(Self { enabled, start_measure, end_measure })
    }

    /// Number of measures in the window; zero when inverted.
    pub fn len(&self) -> u32 {
        self.end_measure.saturating_sub(self.start_measure)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map a monotonically increasing schedule measure to the measure that
    /// should sound, wrapping into `[start, end)` once `end` is passed.
    /// Empty or inverted windows never wrap.
    pub fn wrap(&self, measure: u32) -> u32 {
        if !self.enabled || measure < self.end_measure || self.is_empty() {
            return measure;
        }
        self.start_measure + (measure - self.start_measure) % self.len()
    }
}
