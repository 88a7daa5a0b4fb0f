//! Audio frame type.

/// A stereo audio frame (16-bit integer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: i16) -> Self {
        Self { left: value, right: value }
    }

    /// Quantise a float stereo pair in [-1, 1], clipping outside it.
    pub fn from_f32(left: f32, right: f32) -> Self {
        Self { left: quantize(left), right: quantize(right) }
    }

    /// Both channels scaled to [-1, 1).
    pub fn to_f32(self) -> (f32, f32) {
        (self.left as f32 / 32768.0, self.right as f32 / 32768.0)
    }

    pub fn is_silent(self) -> bool {
        self.left == 0 && self.right == 0
    }
}

fn quantize(value: f32) -> i16 {
    if value.is_nan() {
        return 0;
    }
    (value * 32767.0).clamp(-32768.0, 32767.0) as i16
}
