//! Wavetable bank: 100 melodic waveforms plus embedded drum recordings.
//!
//! Layout: `100 * 256` signed 8-bit samples, then any number of RIFF/WAVE
//! drum files packed with arbitrary gaps between them. The drum section is
//! found by scanning for `WAVE` tags; each hit is parsed in place and the
//! scan resumes after its data. Drum PCM is only decoded on first use.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use arrayvec::ArrayString;
use og_ir::{InstrumentId, SampleSource, WaveformSample, DRUM_SLOTS, MELODIC_COUNT, WAVE_LEN};

use crate::wav_format::{read_wave_body, PcmChunk};
use crate::LoadError;

/// Bytes taken by the melodic tables at the start of the blob.
pub const MELODIC_BYTES: usize = MELODIC_COUNT as usize * WAVE_LEN;

/// Wavetable store settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Drums beyond this many are ignored.
    pub max_drums: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_drums: DRUM_SLOTS as usize }
    }
}

/// Names of everything the store can play, in bank order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstrumentList {
    pub melodic: Vec<ArrayString<16>>,
    pub drums: Vec<ArrayString<16>>,
}

/// A drum located in the blob, decoded on first request.
#[derive(Debug)]
struct DrumSlot {
    name: ArrayString<16>,
    chunk: PcmChunk,
    decoded: OnceLock<Option<Arc<WaveformSample>>>,
}

/// Owns every sample buffer for the lifetime of the process.
#[derive(Debug, Default)]
pub struct WavetableStore {
    config: StoreConfig,
    melodic: Vec<Arc<WaveformSample>>,
    drums: Vec<DrumSlot>,
    blob: Vec<u8>,
}

impl WavetableStore {
    /// Create an empty store; every lookup returns `None` until `load`.
    pub fn new(config: StoreConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// Create a store from a blob with the default settings.
    pub fn from_blob(blob: Vec<u8>) -> Result<Self, LoadError> {
        let mut store = Self::new(StoreConfig::default());
        store.load(blob)?;
        Ok(store)
    }

    /// Replace the store's contents with `blob`.
    ///
    /// On error the store is left empty.
    pub fn load(&mut self, blob: Vec<u8>) -> Result<(), LoadError> {
        self.clear();
        if blob.len() < MELODIC_BYTES {
            return Err(LoadError::TooShort { len: blob.len(), need: MELODIC_BYTES });
        }

        self.melodic = blob[..MELODIC_BYTES]
            .chunks_exact(WAVE_LEN)
            .enumerate()
            .map(|(i, raw)| {
                let signed: Vec<i8> = raw.iter().map(|&b| b as i8).collect();
                let name = InstrumentId::Melodic(i as u8).name();
                Arc::new(WaveformSample::wavetable(&name, &signed))
            })
            .collect();
        self.drums = scan_drums(&blob, self.config.max_drums);
        self.blob = blob;

        log::info!(
            "wavetable bank loaded: {} waveforms, {} drums",
            self.melodic.len(),
            self.drums.len()
        );
        Ok(())
    }

    /// Read and load a bank file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.clear();
        let blob = std::fs::read(path.as_ref())?;
        self.load(blob)
    }

    /// Drop every buffer.
    pub fn clear(&mut self) {
        self.melodic.clear();
        self.drums.clear();
        self.blob = Vec::new();
    }

    pub fn is_loaded(&self) -> bool {
        !self.melodic.is_empty()
    }

    pub fn melodic_count(&self) -> usize {
        self.melodic.len()
    }

    pub fn drum_count(&self) -> usize {
        self.drums.len()
    }

    /// Names of all loaded instruments.
    pub fn list_instruments(&self) -> InstrumentList {
        InstrumentList {
            melodic: self.melodic.iter().map(|s| s.name).collect(),
            drums: self.drums.iter().map(|d| d.name).collect(),
        }
    }

    /// Shared buffer for `instrument`, decoding a drum on first use.
    pub fn sample_for(&self, instrument: InstrumentId) -> Option<Arc<WaveformSample>> {
        match instrument {
            InstrumentId::Melodic(i) => self.melodic.get(i as usize).cloned(),
            InstrumentId::Drum(i) => {
                let slot = self.drums.get(i as usize)?;
                slot.decoded
                    .get_or_init(|| match slot.chunk.decode(&self.blob, &slot.name) {
                        Ok(sample) => Some(Arc::new(sample)),
                        Err(e) => {
                            log::warn!("drum {} failed to decode: {}", slot.name, e);
                            None
                        }
                    })
                    .clone()
            }
        }
    }
}

impl SampleSource for WavetableStore {
    fn sample_for(&self, instrument: InstrumentId) -> Option<Arc<WaveformSample>> {
        WavetableStore::sample_for(self, instrument)
    }

    fn drum_count(&self) -> usize {
        self.drums.len()
    }
}

/// Locate up to `max` mono PCM drums after the melodic tables.
fn scan_drums(blob: &[u8], max: usize) -> Vec<DrumSlot> {
    let mut drums = Vec::new();
    let mut pos = MELODIC_BYTES;

    while drums.len() < max {
        let Some(found) = find_tag(&blob[pos..], b"WAVE") else { break };
        let tag = pos + found;
        match read_wave_body(blob, tag + 4) {
            Ok((chunk, end)) => {
                pos = end;
                if let Err(e) = chunk.format.check_mono_pcm() {
                    log::warn!("skipping drum at offset {}: {}", tag, e);
                    continue;
                }
                let name = InstrumentId::Drum(drums.len() as u8).name();
                log::debug!(
                    "drum {} at offset {}: {} Hz, {} bit, {} frames",
                    name,
                    tag,
                    chunk.format.sample_rate,
                    chunk.format.bits_per_sample,
                    chunk.frames()
                );
                drums.push(DrumSlot { name, chunk, decoded: OnceLock::new() });
            }
            Err(e) => {
                log::warn!("unreadable WAVE at offset {}: {}", tag, e);
                pos = tag + 4;
            }
        }
    }
    drums
}

fn find_tag(haystack: &[u8], tag: &[u8; 4]) -> Option<usize> {
    haystack.windows(tag.len()).position(|w| w == tag)
}
