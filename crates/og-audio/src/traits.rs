//! Audio output trait and error types.

use og_engine::Frame;
use thiserror::Error;

/// Error type for audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
}

/// A sink the player thread pushes rendered frames into.
///
/// Writes never block; the player renders only as many frames as
/// `available` reports and sleeps otherwise, so stop requests stay prompt.
pub trait AudioOutput {
    /// Device sample rate.
    fn sample_rate(&self) -> u32;

    /// Frames that can be written right now without dropping any.
    fn available(&self) -> usize;

    /// Queue frames for output. Returns how many were accepted.
    fn write(&mut self, frames: &[Frame]) -> Result<usize, AudioError>;

    /// Start playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), AudioError>;
}
