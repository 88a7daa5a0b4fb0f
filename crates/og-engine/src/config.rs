//! Engine configuration.

/// Attack and release timings applied to every voice, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeShape {
    /// Linear attack ramp for melodic notes.
    pub attack: f64,
    /// Notes shorter than this start at full gain.
    pub short_note: f64,
    /// Ramp to silence on an explicit stop.
    pub stop_release: f64,
    /// Upper bound of the end-of-note release ramp.
    pub max_release: f64,
    /// End-of-note release as a fraction of the note length.
    pub release_fraction: f64,
}

impl Default for EnvelopeShape {
    fn default() -> Self {
        Self {
            attack: 0.002,
            short_note: 0.05,
            stop_release: 0.005,
            max_release: 0.1,
            release_fraction: 0.2,
        }
    }
}

impl EnvelopeShape {
    /// Length of the release ramp that ends a note of `duration` seconds.
    pub fn release_for(&self, duration: f64) -> f64 {
        (duration * self.release_fraction).min(self.max_release).max(0.0)
    }
}

/// Playback engine settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    /// Output rate in Hz
    pub sample_rate: u32,
    /// How far ahead of the render clock notes are scheduled (seconds)
    pub lookahead: f64,
    /// Host tick period (seconds); kept below `lookahead`
    pub poll_interval: f64,
    /// Voice pool capacity
    pub max_voices: usize,
    pub envelope: EnvelopeShape,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            lookahead: 0.1,
            poll_interval: 0.05,
            max_voices: crate::voice_pool::MAX_VOICES,
            envelope: EnvelopeShape::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    pub fn with_lookahead(mut self, lookahead: f64) -> Self {
        if lookahead.is_finite() && lookahead > 0.0 {
            self.lookahead = lookahead;
        }
        self.normalize()
    }

    pub fn with_poll_interval(mut self, poll_interval: f64) -> Self {
        if poll_interval.is_finite() && poll_interval > 0.0 {
            self.poll_interval = poll_interval;
        }
        self.normalize()
    }

    pub fn with_max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = max_voices.max(1);
        self
    }

    pub fn with_envelope(mut self, envelope: EnvelopeShape) -> Self {
        self.envelope = envelope;
        self
    }

    /// Frames between host ticks at the configured rate.
    pub fn poll_frames(&self) -> usize {
        ((self.poll_interval * self.sample_rate as f64) as usize).max(1)
    }

    /// The poll interval must stay under the lookahead or notes arrive late.
    fn normalize(mut self) -> Self {
        if self.poll_interval >= self.lookahead {
            let clamped = self.lookahead / 2.0;
            log::warn!(
                "poll interval {:.3}s not below lookahead {:.3}s, using {:.3}s",
                self.poll_interval,
                self.lookahead,
                clamped
            );
            self.poll_interval = clamped;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.sample_rate, 44100);
        assert_eq!(c.lookahead, 0.1);
        assert_eq!(c.poll_interval, 0.05);
        assert_eq!(c.max_voices, 128);
        assert_eq!(c.poll_frames(), 2205);
    }

    #[test]
    fn poll_interval_clamped_below_lookahead() {
        let c = EngineConfig::default().with_poll_interval(0.5);
        assert!(c.poll_interval < c.lookahead);
        let c = EngineConfig::default().with_lookahead(0.02);
        assert!(c.poll_interval < 0.02);
    }

    #[test]
    fn invalid_values_ignored() {
        let c = EngineConfig::default().with_lookahead(f64::NAN).with_poll_interval(-1.0);
        assert_eq!(c, EngineConfig::default());
    }

    #[test]
    fn release_is_capped() {
        let e = EnvelopeShape::default();
        assert!((e.release_for(0.25) - 0.05).abs() < 1e-12);
        assert!((e.release_for(2.0) - 0.1).abs() < 1e-12);
    }
}
