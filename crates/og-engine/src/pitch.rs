//! Key-to-playback-rate conversion.
//!
//! Melodic keys live on a 72-EDO grid (six steps per semitone). The nearest
//! semitone selects one of twelve integer "point frequencies", the octave
//! selects a period-size divisor, and the remaining step distance bends the
//! period geometrically so every one of the 576 keys gets its own pitch while
//! the wavetable timbre stays anchored to the twelve table points.

use og_ir::{clamp_key, KEYS_PER_OCTAVE, KEYS_PER_SEMITONE, WAVE_LEN};

/// Point frequencies for the twelve semitones (top-octave Hz, integer rounded).
pub const POINT_FREQUENCIES: [u32; 12] = [
    4186, 4435, 4699, 4978, 5274, 5588, 5920, 6272, 6645, 7040, 7459, 7902,
];

/// Period-size divisor per octave (octave 0 is the lowest).
pub const PERIOD_SIZES: [u32; 8] = [128, 64, 32, 16, 8, 4, 2, 1];

/// Sample rate drum recordings are pitched against.
pub const DRUM_BASE_RATE: f64 = 22050.0;

/// Drum frequency added per de-microtonalised key step.
const DRUM_FREQ_STEP: f64 = 800.0;

/// Drum frequency at key 0.
const DRUM_FREQ_FLOOR: f64 = 100.0;

/// A key split into its table coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyParts {
    /// 0..8
    pub octave: usize,
    /// Nearest semitone, 0..12
    pub pitch_class: usize,
    /// 72-EDO steps above the pitch class's table point (may exceed a
    /// semitone when rounding wrapped the pitch class back to 0)
    pub residual: i32,
}

/// Split a key; out-of-range keys are clamped first.
pub fn split_key(key: i32) -> KeyParts {
    let key = clamp_key(key);
    let octave = (key / KEYS_PER_OCTAVE) as usize;
    let step = key % KEYS_PER_OCTAVE;
    // round half up, then fold 12 back onto 0
    let pitch_class = ((step + KEYS_PER_SEMITONE / 2) / KEYS_PER_SEMITONE % 12) as usize;
    let residual = step as i32 - (pitch_class as i32 * KEYS_PER_SEMITONE as i32);
    KeyParts { octave, pitch_class, residual }
}

/// Converts keys to frequencies and playback rates for one device rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchModel {
    sample_rate: u32,
}

impl PitchModel {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate: sample_rate.max(1) }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frequency in Hz of a melodic key.
    ///
    /// `freq_adjust` is added to the point frequency before the octave
    /// division; 0 leaves the table untouched.
    pub fn frequency_for(&self, key: i32, freq_adjust: i32) -> f64 {
        let parts = split_key(key);
        let point =
            (POINT_FREQUENCIES[parts.pitch_class] as i64 + freq_adjust as i64).max(1) as f64;
        let bend = libm::exp2(parts.residual as f64 / KEYS_PER_OCTAVE as f64);
        point * bend / PERIOD_SIZES[parts.octave] as f64
    }

    /// Wavetable playback rate (source samples per output sample) for a key.
    pub fn rate_for(&self, key: i32, freq_adjust: i32) -> f64 {
        self.frequency_for(key, freq_adjust) * WAVE_LEN as f64 / self.sample_rate as f64
    }

    /// Drum playback rate relative to the recording's own sample rate.
    pub fn drum_rate_for(key: i32) -> f64 {
        let step = (clamp_key(key) / KEYS_PER_SEMITONE).min(255) as f64;
        (step * DRUM_FREQ_STEP + DRUM_FREQ_FLOOR) / DRUM_BASE_RATE
    }
}
