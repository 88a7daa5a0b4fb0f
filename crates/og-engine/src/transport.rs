//! Transport state machine and render-time to measure mapping.

use alloc::collections::VecDeque;

/// Markers kept for position lookups.
const MAX_MARKERS: usize = 64;

/// Transport state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Stopped/Playing/Paused plus where each scheduled measure begins.
#[derive(Clone, Debug, Default)]
pub struct Transport {
    state: TransportState,
    /// Measure a resume starts from.
    resume_measure: u32,
    /// `(render time, display measure)` in scheduling order.
    markers: VecDeque<(f64, u32)>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Enter Playing. Returns the measure scheduling starts from, or `None`
    /// if already playing.
    ///
    /// A paused transport resumes where it paused and ignores `from`; a
    /// stopped one starts at `from`, else measure 0.
    pub fn begin_play(&mut self, from: Option<u32>) -> Option<u32> {
        let start = match self.state {
            TransportState::Playing => return None,
            TransportState::Paused => self.resume_measure,
            TransportState::Stopped => from.unwrap_or(0),
        };
        self.state = TransportState::Playing;
        self.resume_measure = start;
        self.markers.clear();
        Some(start)
    }

    /// Enter Paused, remembering the measure sounding at `now`.
    pub fn pause(&mut self, now: f64) -> bool {
        if self.state != TransportState::Playing {
            return false;
        }
        self.resume_measure = self.current_measure(now);
        self.state = TransportState::Paused;
        self.markers.clear();
        true
    }

    /// Enter Stopped and rewind to measure 0. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        let was_stopped = self.state == TransportState::Stopped;
        self.state = TransportState::Stopped;
        self.resume_measure = 0;
        self.markers.clear();
        !was_stopped
    }

    /// Record that `measure` starts sounding at render time `time`.
    pub fn mark(&mut self, time: f64, measure: u32) {
        if self.markers.len() == MAX_MARKERS {
            self.markers.pop_front();
        }
        self.markers.push_back((time, measure));
    }

    /// Measure sounding at render time `now`.
    pub fn current_measure(&self, now: f64) -> u32 {
        match self.state {
            TransportState::Stopped => 0,
            TransportState::Paused => self.resume_measure,
            TransportState::Playing => self
                .markers
                .iter()
                .rev()
                .find(|(time, _)| *time <= now)
                .or(self.markers.front())
                .map_or(self.resume_measure, |&(_, measure)| measure),
        }
    }
}
