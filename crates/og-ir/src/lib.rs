//! Core data model for the organelle playback core.
//!
//! This crate defines the note stream consumed by the scheduler, the song
//! container derived from it, tempo/measure arithmetic and the immutable
//! sample buffers shared by every voice. Importers and the editor produce
//! these types; the engine only reads them.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_traits;
mod instrument;
mod note;
mod sample;
pub mod song;
mod timing;

pub use audio_traits::SampleSource;
pub use instrument::{InstrumentId, DRUM_NAMES, DRUM_SLOTS, MELODIC_COUNT};
pub use note::{
    clamp_key, AutomationPoint, LoopPolicy, Note, KEYS_PER_OCTAVE, KEYS_PER_SEMITONE, KEY_COUNT,
    MAX_KEY, OCTAVES,
};
pub use sample::{SampleKind, WaveformSample, WAVE_LEN};
pub use song::{Song, Track, MIN_SONG_MEASURES};
pub use timing::{LoopWindow, Timing};
