//! Voice: one sounding note bound to a shared sample buffer.

use alloc::sync::Arc;
use og_ir::{InstrumentId, WaveformSample};

use crate::automation::ParamTimeline;

/// Which playback rules a voice follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceKind {
    /// Looped wavetable, owns a key slot.
    Melodic,
    /// One-shot recording, never owns a key slot.
    Drum,
}

/// Voice lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// Owns its key slot.
    #[default]
    Active,
    /// Lost its key slot to a newer note; finishing the current cycle.
    Retiring,
    /// Explicitly stopped; ramping out.
    Released,
    /// Done producing audio, waiting to be reaped.
    Finished,
}

/// A single voice producing audio from a sample.
#[derive(Clone, Debug)]
pub struct Voice {
    pub key: u16,
    pub instrument: InstrumentId,
    pub kind: VoiceKind,
    sample: Arc<WaveformSample>,
    /// Read position in source frames.
    pub position: f64,
    /// Source frames advanced per output frame.
    pub increment: f64,
    /// Render-clock seconds the voice becomes audible.
    pub start_time: f64,
    /// Hard stop deadline.
    pub stop_time: Option<f64>,
    /// Wrap at the end of the buffer instead of finishing.
    pub looping: bool,
    /// Looping is switched off from this time on.
    pub loop_until: Option<f64>,
    /// Ended itself at a finite loop boundary.
    pub self_stopped: bool,
    pub gain: ParamTimeline,
    /// -1.0 (left) to 1.0 (right)
    pub pan: ParamTimeline,
    pub state: VoiceState,
    /// Is the voice currently producing audio?
    pub playing: bool,
}

impl Voice {
    pub fn new(
        key: u16,
        instrument: InstrumentId,
        kind: VoiceKind,
        sample: Arc<WaveformSample>,
        increment: f64,
        start_time: f64,
    ) -> Self {
        Self {
            key,
            instrument,
            kind,
            sample,
            position: 0.0,
            increment,
            start_time,
            stop_time: None,
            looping: false,
            loop_until: None,
            self_stopped: false,
            gain: ParamTimeline::new(1.0),
            pan: ParamTimeline::new(0.0),
            state: VoiceState::Active,
            playing: true,
        }
    }

    pub fn sample(&self) -> &Arc<WaveformSample> {
        &self.sample
    }

    pub fn is_drum(&self) -> bool {
        self.kind == VoiceKind::Drum
    }

    /// Whether the buffer still wraps at `time`.
    pub fn loops_at(&self, time: f64) -> bool {
        self.looping && self.loop_until.map_or(true, |until| time < until)
    }

    /// Stop looping from `time` on; the voice plays out its current cycle.
    pub fn retire(&mut self, time: f64) {
        self.loop_until = Some(self.loop_until.map_or(time, |until| until.min(time)));
        if self.state == VoiceState::Active {
            self.state = VoiceState::Retiring;
        }
    }

    /// Ramp to silence over `release` seconds starting at `time`, then stop.
    pub fn release(&mut self, time: f64, release: f64) {
        let end = time + release;
        self.gain.hold_at(time);
        self.gain.linear_ramp_to(end, 0.0);
        self.stop_time = Some(self.stop_time.map_or(end, |stop| stop.min(end)));
        self.state = VoiceState::Released;
    }

    /// Done at `time`: stopped, past its deadline, or already ended.
    pub fn is_done(&self, time: f64) -> bool {
        !self.playing || self.stop_time.is_some_and(|stop| time >= stop)
    }

    fn finish(&mut self) {
        self.playing = false;
        self.state = VoiceState::Finished;
    }

    /// Render one output frame at render-clock `time`.
    ///
    /// `time` must not decrease between calls.
    pub fn render_frame(&mut self, time: f64) -> (f32, f32) {
        if !self.playing || time < self.start_time {
            return (0.0, 0.0);
        }
        if self.stop_time.is_some_and(|stop| time >= stop) {
            self.finish();
            return (0.0, 0.0);
        }
        let len = self.sample.len() as f64;
        if self.position >= len {
            if len > 0.0 && self.loops_at(time) {
                self.position = libm::fmod(self.position, len);
            } else {
                self.finish();
                return (0.0, 0.0);
            }
        }

        let value = self.sample.read_interpolated(self.position);
        let gain = self.gain.sample(time);
        let (left, right) = pan_gains(self.pan.sample(time));
        self.position += self.increment;
        (value * gain * left, value * gain * right)
    }
}

/// Equal-power pan law for a -1..1 position.
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let x = (pan.clamp(-1.0, 1.0) + 1.0) * 0.5 * core::f32::consts::FRAC_PI_2;
    (libm::cosf(x), libm::sinf(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use og_ir::SampleKind;

    fn dc_table() -> Arc<WaveformSample> {
        Arc::new(WaveformSample::with_data("dc", 0, SampleKind::Wavetable, vec![0.5; 4]))
    }

    fn melodic_voice(start: f64) -> Voice {
        Voice::new(0, InstrumentId::Melodic(0), VoiceKind::Melodic, dc_table(), 1.0, start)
    }

    fn one_shot(len: usize) -> Arc<WaveformSample> {
        Arc::new(WaveformSample::with_data("hit", 22050, SampleKind::OneShot, vec![1.0; len]))
    }

    fn render(voice: &mut Voice, frames: usize, dt: f64) -> usize {
        (0..frames).filter(|&i| voice.render_frame(i as f64 * dt) != (0.0, 0.0)).count()
    }

    #[test]
    fn center_pan_is_equal_power() {
        let (l, r) = pan_gains(0.0);
        assert!((l - r).abs() < 1e-6);
        assert!((l * l + r * r - 1.0).abs() < 1e-5);
        let (l, r) = pan_gains(-1.0);
        assert!((l - 1.0).abs() < 1e-6 && r.abs() < 1e-6);
    }

    #[test]
    fn silent_before_start() {
        let mut v = melodic_voice(1.0);
        v.looping = true;
        assert_eq!(v.render_frame(0.5), (0.0, 0.0));
        assert_eq!(v.position, 0.0);
        assert_ne!(v.render_frame(1.0), (0.0, 0.0));
    }

    #[test]
    fn looping_voice_wraps() {
        let mut v = melodic_voice(0.0);
        v.looping = true;
        assert_eq!(render(&mut v, 20, 0.001), 20);
        assert!(v.playing);
    }

    #[test]
    fn one_shot_finishes_at_buffer_end() {
        let mut v = Voice::new(0, InstrumentId::Drum(0), VoiceKind::Drum, one_shot(5), 1.0, 0.0);
        assert_eq!(render(&mut v, 20, 0.001), 5);
        assert!(!v.playing);
        assert_eq!(v.state, VoiceState::Finished);
    }

    #[test]
    fn retire_finishes_current_cycle() {
        let mut v = melodic_voice(0.0);
        v.looping = true;
        v.retire(0.0055);
        // frames 0..5 loop once, position 4 wraps at t=0.004; the wrap at
        // t=0.008 is past the retire time so the cycle ends there
        assert_eq!(render(&mut v, 20, 0.001), 8);
        assert_eq!(v.state, VoiceState::Finished);
    }

    #[test]
    fn stop_deadline_ends_voice() {
        let mut v = melodic_voice(0.0);
        v.looping = true;
        v.stop_time = Some(0.01);
        assert_eq!(render(&mut v, 100, 0.001), 10);
        assert!(v.is_done(0.01));
    }

    #[test]
    fn release_ramps_to_zero_and_keeps_earlier_deadline() {
        let mut v = melodic_voice(0.0);
        v.looping = true;
        v.stop_time = Some(0.5);
        v.release(1.0, 0.005);
        assert_eq!(v.stop_time, Some(0.5));
        v.release(0.1, 0.005);
        assert_eq!(v.stop_time, Some(0.105));
        assert!((v.gain.value_at(0.1025) - 0.5).abs() < 1e-4);
        assert_eq!(v.state, VoiceState::Released);
    }

    #[test]
    fn gain_and_pan_apply() {
        let mut v = melodic_voice(0.0);
        v.looping = true;
        v.gain.set_value_at(0.0, 0.5);
        v.pan.set_value_at(0.0, 1.0);
        let (l, r) = v.render_frame(0.0);
        assert!(l.abs() < 1e-6);
        assert!((r - 0.25).abs() < 1e-6);
    }
}
