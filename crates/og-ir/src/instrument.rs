//! Instrument identifiers.

use arrayvec::ArrayString;
use core::fmt::Write;

/// Number of melodic wavetables in the bank.
pub const MELODIC_COUNT: u8 = 100;

/// Number of drum slots a song can address.
pub const DRUM_SLOTS: u8 = 6;

/// Display names for the drum slots, in bank order.
pub const DRUM_NAMES: [&str; DRUM_SLOTS as usize] =
    ["Bass01", "Bass02", "Snare01", "Snare02", "Tom01", "HiClose"];

/// Which bank entry a note plays.
///
/// Ordering puts every melodic instrument before every drum, which is the
/// order tracks are listed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstrumentId {
    /// Wavetable voice, 0..100
    Melodic(u8),
    /// One-shot PCM drum, 0..DRUM_SLOTS
    Drum(u8),
}

impl Default for InstrumentId {
    fn default() -> Self {
        InstrumentId::Melodic(0)
    }
}

impl InstrumentId {
    /// Returns true for drum instruments.
    pub fn is_drum(self) -> bool {
        matches!(self, InstrumentId::Drum(_))
    }

    /// Index within its bank (melodic or drum).
    pub fn index(self) -> usize {
        match self {
            InstrumentId::Melodic(i) | InstrumentId::Drum(i) => i as usize,
        }
    }

    /// Short display name: `M07` for wavetables, the drum name for drums.
    pub fn name(self) -> ArrayString<16> {
        let mut name = ArrayString::new();
        match self {
            InstrumentId::Melodic(i) => {
                let _ = write!(name, "M{:02}", i);
            }
            InstrumentId::Drum(i) => match DRUM_NAMES.get(i as usize) {
                Some(n) => {
                    let _ = name.try_push_str(n);
                }
                None => {
                    let _ = write!(name, "Drum{}", i);
                }
            },
        }
        name
    }
}
