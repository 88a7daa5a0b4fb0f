//! Trait boundary between the sample store and the engine.

use alloc::sync::Arc;

use crate::instrument::InstrumentId;
use crate::sample::WaveformSample;

/// Anything that can hand out shared sample buffers by instrument.
///
/// Lookups that fail mean "play silence", never an error.
pub trait SampleSource {
    /// Buffer for `instrument`, or `None` if the bank has nothing for it.
    fn sample_for(&self, instrument: InstrumentId) -> Option<Arc<WaveformSample>>;

    /// Number of drum samples available.
    fn drum_count(&self) -> usize;
}
