//! Song container built from a note stream.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::instrument::InstrumentId;
use crate::note::Note;
use crate::timing::Timing;

/// Shortest song length in measures, even for an empty note stream.
pub const MIN_SONG_MEASURES: u32 = 4;

/// Per-instrument summary of the notes in a song.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub instrument: InstrumentId,
    pub name: ArrayString<16>,
    pub note_count: usize,
}

/// A complete song: tempo plus the notes sorted by start tick.
#[derive(Clone, Debug, Default)]
pub struct Song {
    /// Song title
    pub title: ArrayString<32>,
    pub timing: Timing,
    notes: Vec<Note>,
    tracks: Vec<Track>,
}

impl Song {
    /// Create an empty song.
    pub fn new(title: &str) -> Self {
        let mut song = Self::default();
        let _ = song.title.try_push_str(title);
        song
    }

    /// Build a song from an unordered note stream.
    ///
    /// Notes are stably sorted by start tick, so notes sharing a tick keep
    /// the order the importer produced them in.
    pub fn from_notes(title: &str, timing: Timing, mut notes: Vec<Note>) -> Self {
        notes.sort_by_key(|n| n.start_tick);
        let mut song = Self::new(title);
        song.timing = timing;
        song.tracks = build_tracks(&notes);
        song.notes = notes;
        song
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// One entry per instrument that has notes, melodic first.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Notes whose start falls inside `measure`.
    pub fn notes_in_measure(&self, measure: u32) -> &[Note] {
        let start = self.timing.measure_start_tick(measure);
        let end = start + self.timing.ticks_per_measure();
        let lo = self.notes.partition_point(|n| n.start_tick < start);
        let hi = self.notes.partition_point(|n| n.start_tick < end);
        &self.notes[lo..hi]
    }

    /// Song length in measures: the measure holding the latest note end,
    /// rounded up, never less than `MIN_SONG_MEASURES`.
    pub fn length_measures(&self) -> u32 {
        let tpm = self.timing.ticks_per_measure();
        let last_end = self.notes.iter().map(Note::end_tick).max().unwrap_or(0);
        let measures = last_end.div_ceil(tpm) as u32;
        measures.max(MIN_SONG_MEASURES)
    }
}

fn build_tracks(notes: &[Note]) -> Vec<Track> {
    let mut counts: BTreeMap<InstrumentId, usize> = BTreeMap::new();
    for note in notes {
        *counts.entry(note.instrument).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(instrument, note_count)| Track { instrument, name: instrument.name(), note_count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(start: u64, len: u32, instrument: InstrumentId) -> Note {
        Note::new(240, instrument, start, len)
    }

    #[test]
    fn empty_song_is_four_measures() {
        let song = Song::new("empty");
        assert!(song.is_empty());
        assert_eq!(song.length_measures(), MIN_SONG_MEASURES);
    }

    #[test]
    fn notes_are_sorted_on_build() {
        let song = Song::from_notes(
            "t",
            Timing::default(),
            vec![note(400, 10, InstrumentId::Melodic(0)), note(0, 10, InstrumentId::Melodic(0))],
        );
        assert_eq!(song.notes()[0].start_tick, 0);
        assert_eq!(song.notes()[1].start_tick, 400);
    }

    #[test]
    fn notes_in_measure_selects_by_start() {
        // 192 ticks per measure
        let song = Song::from_notes(
            "t",
            Timing::default(),
            vec![
                note(0, 10, InstrumentId::Melodic(0)),
                note(191, 10, InstrumentId::Melodic(0)),
                note(192, 10, InstrumentId::Melodic(0)),
                note(600, 10, InstrumentId::Melodic(0)),
            ],
        );
        assert_eq!(song.notes_in_measure(0).len(), 2);
        assert_eq!(song.notes_in_measure(1).len(), 1);
        assert_eq!(song.notes_in_measure(2).len(), 0);
        assert_eq!(song.notes_in_measure(3).len(), 1);
        assert_eq!(song.notes_in_measure(40).len(), 0);
    }

    #[test]
    fn length_rounds_latest_end_up() {
        let song = Song::from_notes(
            "t",
            Timing::default(),
            vec![note(192 * 6, 200, InstrumentId::Melodic(0))],
        );
        // ends at tick 1352, inside measure 7 → 8 measures
        assert_eq!(song.length_measures(), 8);
    }

    #[test]
    fn tracks_count_notes_per_instrument() {
        let song = Song::from_notes(
            "t",
            Timing::default(),
            vec![
                note(0, 1, InstrumentId::Drum(2)),
                note(0, 1, InstrumentId::Melodic(5)),
                note(10, 1, InstrumentId::Melodic(5)),
            ],
        );
        let tracks = song.tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].instrument, InstrumentId::Melodic(5));
        assert_eq!(tracks[0].note_count, 2);
        assert_eq!(tracks[0].name.as_str(), "M05");
        assert_eq!(tracks[1].name.as_str(), "Snare01");
    }
}
