//! Output that discards frames, for headless machines and tests.

use og_engine::Frame;
use std::time::Instant;

use crate::traits::{AudioError, AudioOutput};

/// Swallows audio. When paced, it accepts frames no faster than a real
/// device at `sample_rate` would consume them.
#[derive(Debug)]
pub struct NullOutput {
    sample_rate: u32,
    capacity: usize,
    paced: bool,
    started: Option<Instant>,
    written: u64,
}

impl NullOutput {
    /// A paced sink with `capacity` frames of buffering.
    pub fn new(sample_rate: u32, capacity: usize) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            capacity: capacity.max(1),
            paced: true,
            started: None,
            written: 0,
        }
    }

    /// A sink that accepts everything immediately.
    pub fn unpaced(sample_rate: u32) -> Self {
        Self { paced: false, ..Self::new(sample_rate, 4096) }
    }

    /// Frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.written
    }

    fn consumed(&self) -> u64 {
        match self.started {
            Some(at) => (at.elapsed().as_secs_f64() * self.sample_rate as f64) as u64,
            None => 0,
        }
    }
}

impl AudioOutput for NullOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn available(&self) -> usize {
        if !self.paced {
            return self.capacity;
        }
        let queued = self.written.saturating_sub(self.consumed()) as usize;
        self.capacity.saturating_sub(queued)
    }

    fn write(&mut self, frames: &[Frame]) -> Result<usize, AudioError> {
        let n = frames.len().min(self.available());
        self.written += n as u64;
        Ok(n)
    }

    fn start(&mut self) -> Result<(), AudioError> {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.started = None;
        self.written = 0;
        Ok(())
    }
}
