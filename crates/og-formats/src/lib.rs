//! Binary formats for the organelle playback core.
//!
//! Loads the wavetable bank (100 melodic waveforms followed by embedded
//! RIFF/WAVE drum recordings) and reads/writes standalone WAV files.

mod wav_format;
mod wavetable;

pub use wav_format::{frames_to_wav, load_wav, read_wave_body, write_wav, PcmChunk, WaveFormat};
pub use wavetable::{InstrumentList, StoreConfig, WavetableStore, MELODIC_BYTES};

use thiserror::Error;

/// Error type for format parsing.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    #[error("invalid RIFF/WAVE header")]
    InvalidHeader,
    /// Unexpected end of data
    #[error("unexpected end of data")]
    UnexpectedEof,
    /// A required chunk never appeared
    #[error("missing `{0}` chunk")]
    MissingChunk(&'static str),
    /// Compressed or otherwise non-PCM audio
    #[error("unsupported WAVE encoding {0:#06x}")]
    UnsupportedEncoding(u16),
    #[error("unsupported sample width: {0} bits")]
    UnsupportedBits(u16),
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u16),
    /// A zero rate can't be resampled
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),
}

/// Error type for loading the wavetable bank.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The blob can't even hold the melodic tables
    #[error("wavetable blob is {len} bytes, need at least {need}")]
    TooShort { len: usize, need: usize },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("failed to read wavetable file")]
    Io(#[from] std::io::Error),
}
