//! Sample buffers shared by voices.

use alloc::vec::Vec;
use arrayvec::ArrayString;

/// Length of one melodic waveform in samples.
pub const WAVE_LEN: usize = 256;

/// How a buffer is played back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleKind {
    /// Single-cycle waveform, pitched by playback rate and looped.
    Wavetable,
    /// One-shot PCM recording (drums).
    OneShot,
}

/// An immutable mono sample buffer.
///
/// Once constructed it is never modified; voices share it through `Arc`.
#[derive(Clone, Debug)]
pub struct WaveformSample {
    /// Display name
    pub name: ArrayString<16>,
    /// Native sample rate in Hz (wavetables use the device rate implicitly)
    pub sample_rate: u32,
    pub kind: SampleKind,
    data: Vec<f32>,
}

impl WaveformSample {
    /// Build a wavetable from signed 8-bit samples, scaled to [-1, 1].
    pub fn wavetable(name: &str, raw: &[i8]) -> Self {
        let data = raw.iter().map(|&s| s as f32 / 128.0).collect();
        Self::with_data(name, 0, SampleKind::Wavetable, data)
    }

    /// Build a one-shot from unsigned 8-bit PCM (WAV convention, center 128).
    pub fn from_pcm8(name: &str, raw: &[u8], sample_rate: u32) -> Self {
        let data = raw.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect();
        Self::with_data(name, sample_rate, SampleKind::OneShot, data)
    }

    /// Build a one-shot from signed 16-bit PCM.
    pub fn from_pcm16(name: &str, raw: &[i16], sample_rate: u32) -> Self {
        let data = raw.iter().map(|&s| s as f32 / 32768.0).collect();
        Self::with_data(name, sample_rate, SampleKind::OneShot, data)
    }

    /// Build a buffer from already-normalised float samples.
    pub fn with_data(name: &str, sample_rate: u32, kind: SampleKind, data: Vec<f32>) -> Self {
        let mut label = ArrayString::new();
        let _ = label.try_push_str(name);
        Self { name: label, sample_rate, kind, data }
    }

    /// Number of sample frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Sample at `index`, zero outside the buffer.
    pub fn frame(&self, index: usize) -> f32 {
        self.data.get(index).copied().unwrap_or(0.0)
    }

    /// Linearly interpolated read at a fractional position.
    ///
    /// Wavetables wrap the right-hand neighbour around to the start so a
    /// looping cycle has no seam; one-shots fade towards zero past the end.
    pub fn read_interpolated(&self, position: f64) -> f32 {
        if self.data.is_empty() || position < 0.0 {
            return 0.0;
        }
        let idx = libm::floor(position) as usize;
        if idx >= self.data.len() {
            return 0.0;
        }
        let frac = (position - idx as f64) as f32;
        let a = self.data[idx];
        let b = match self.kind {
            SampleKind::Wavetable => self.data[(idx + 1) % self.data.len()],
            SampleKind::OneShot => self.frame(idx + 1),
        };
        a + (b - a) * frac
    }
}
