//! Shared helpers: synthetic wavetable banks and small songs.

#![allow(dead_code)]

use og_formats::{WavetableStore, MELODIC_BYTES};
use og_ir::{InstrumentId, Note, Song, Timing, WAVE_LEN};

/// Mono 16-bit RIFF/WAVE file holding `frames` samples of a slow ramp.
pub fn drum_wave(rate: u32, frames: usize) -> Vec<u8> {
    let pcm: Vec<u8> = (0..frames)
        .flat_map(|i| (((i % 200) as i16 - 100) * 200).to_le_bytes())
        .collect();
    let mut buf = Vec::new();
    buf.extend(b"RIFF");
    buf.extend(&(36 + pcm.len() as u32).to_le_bytes());
    buf.extend(b"WAVE");
    buf.extend(b"fmt ");
    buf.extend(&16u32.to_le_bytes());
    buf.extend(&1u16.to_le_bytes());
    buf.extend(&1u16.to_le_bytes());
    buf.extend(&rate.to_le_bytes());
    buf.extend(&(rate * 2).to_le_bytes());
    buf.extend(&2u16.to_le_bytes());
    buf.extend(&16u16.to_le_bytes());
    buf.extend(b"data");
    buf.extend(&(pcm.len() as u32).to_le_bytes());
    buf.extend(pcm);
    buf
}

/// 100 saw waveforms followed by `drums`.
pub fn bank_blob(drums: &[Vec<u8>]) -> Vec<u8> {
    let mut blob: Vec<u8> =
        (0..MELODIC_BYTES).map(|i| ((i % WAVE_LEN) as u8).wrapping_sub(128)).collect();
    for drum in drums {
        blob.extend(drum);
    }
    blob
}

/// A loaded store with two one-second drums.
pub fn store() -> WavetableStore {
    let drums = [drum_wave(22050, 22050), drum_wave(22050, 22050)];
    WavetableStore::from_blob(bank_blob(&drums)).unwrap()
}

pub fn song(notes: Vec<Note>) -> Song {
    Song::from_notes("test", Timing::default(), notes)
}

pub fn melodic(key: i32, start_tick: u64, duration_ticks: u32) -> Note {
    Note::new(key, InstrumentId::Melodic(0), start_tick, duration_ticks)
}
