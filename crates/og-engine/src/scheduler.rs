//! Lookahead note scheduling.
//!
//! The scheduler keeps a cursor `(time, measure)` on the render clock. Each
//! host tick hands every measure that begins before `now + lookahead` to the
//! voice allocator, one whole measure at a time, then advances the cursor.
//! The cursor only moves forward, so repeated ticks never schedule a measure
//! twice; a late tick simply catches up on every measure it missed and drops
//! the notes whose start has already passed.

use alloc::collections::BTreeSet;
use og_ir::{clamp_key, InstrumentId, LoopWindow, SampleSource, Song};

use crate::event_queue::{EventQueue, PlaybackEvent};
use crate::transport::Transport;
use crate::voice_pool::VoiceAllocator;

/// Next measure to schedule and the render time it starts at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleCursor {
    pub time: f64,
    /// Monotonic schedule measure; wrapped into the loop window for lookup.
    pub measure: u32,
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Measures handed to the allocator
    pub measures: u32,
    /// Voices started
    pub dispatched: usize,
    /// Notes dropped because their start was already past
    pub skipped_late: usize,
}

/// Lookahead scheduler driving the voice allocator.
#[derive(Clone, Debug)]
pub struct NoteScheduler {
    cursor: Option<ScheduleCursor>,
    lookahead: f64,
    loop_window: LoopWindow,
    hidden: BTreeSet<InstrumentId>,
    exhausted: bool,
}

impl NoteScheduler {
    pub fn new(lookahead: f64) -> Self {
        Self {
            cursor: None,
            lookahead,
            loop_window: LoopWindow::default(),
            hidden: BTreeSet::new(),
            exhausted: false,
        }
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead
    }

    pub fn cursor(&self) -> Option<ScheduleCursor> {
        self.cursor
    }

    pub fn is_running(&self) -> bool {
        self.cursor.is_some()
    }

    /// The song ran out with looping off.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Start scheduling `measure` at render time `now`.
    pub fn begin(&mut self, now: f64, measure: u32) {
        self.cursor = Some(ScheduleCursor { time: now, measure });
        self.exhausted = false;
    }

    /// Freeze scheduling; nothing more is handed out until `begin`.
    pub fn halt(&mut self) {
        self.cursor = None;
    }

    pub fn loop_window(&self) -> LoopWindow {
        self.loop_window
    }

    /// Replace the loop window.
    ///
    /// A running cursor is rebased onto the measure it would have played
    /// under the old window, so changing the loop never jumps the playhead.
    /// Empty or inverted windows are rejected and the old window is kept.
    pub fn set_loop_window(&mut self, window: LoopWindow) -> bool {
        if window.start_measure >= window.end_measure {
            log::warn!("ignoring loop window {}..{}", window.start_measure, window.end_measure);
            return false;
        }
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.measure = self.loop_window.wrap(cursor.measure);
        }
        self.loop_window = window;
        self.exhausted = false;
        true
    }

    pub fn set_hidden(&mut self, instrument: InstrumentId, hidden: bool) {
        if hidden {
            self.hidden.insert(instrument);
        } else {
            self.hidden.remove(&instrument);
        }
    }

    pub fn is_hidden(&self, instrument: InstrumentId) -> bool {
        self.hidden.contains(&instrument)
    }

    /// Schedule every measure starting before `now + lookahead`.
    pub fn tick<S: SampleSource + ?Sized>(
        &mut self,
        now: f64,
        song: &Song,
        allocator: &mut VoiceAllocator,
        bank: &S,
        transport: &mut Transport,
        events: &mut EventQueue,
    ) -> TickReport {
        let mut report = TickReport::default();
        let Some(mut cursor) = self.cursor else { return report };
        if self.exhausted {
            return report;
        }

        let seconds_per_tick = song.timing.seconds_per_tick();
        let seconds_per_measure = song.timing.seconds_per_measure();
        let length = song.length_measures();
        let horizon = now + self.lookahead;

        while cursor.time < horizon {
            let display = self.loop_window.wrap(cursor.measure);
            if !self.loop_window.enabled && display >= length {
                log::debug!("song end reached at measure {}", display);
                self.exhausted = true;
                break;
            }
            transport.mark(cursor.time, display);

            let measure_tick = song.timing.measure_start_tick(display);
            for note in song.notes_in_measure(display) {
                if self.hidden.contains(&note.instrument) {
                    continue;
                }
                let when = cursor.time + (note.start_tick - measure_tick) as f64 * seconds_per_tick;
                if when < now {
                    report.skipped_late += 1;
                    continue;
                }
                if let Some(handle) = allocator.start(note, when, seconds_per_tick, bank) {
                    let event = PlaybackEvent::NoteStart {
                        handle,
                        key: clamp_key(note.key as i32),
                        instrument: note.instrument,
                        time: when,
                    };
                    events.push(when, event);
                    report.dispatched += 1;
                }
            }

            cursor.time += seconds_per_measure;
            cursor.measure += 1;
            report.measures += 1;
        }

        if report.skipped_late > 0 {
            log::debug!("late tick at {:.3}s skipped {} notes", now, report.skipped_late);
        }
        self.cursor = Some(cursor);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use og_ir::{Note, SampleKind, Timing, WaveformSample};

    use crate::automation::gain_for_velocity;
    use crate::config::EngineConfig;

    struct Bank(Arc<WaveformSample>);

    impl SampleSource for Bank {
        fn sample_for(&self, _: InstrumentId) -> Option<Arc<WaveformSample>> {
            Some(self.0.clone())
        }

        fn drum_count(&self) -> usize {
            6
        }
    }

    fn bank() -> Bank {
        Bank(Arc::new(WaveformSample::with_data("M00", 0, SampleKind::Wavetable, vec![0.25; 256])))
    }

    struct Rig {
        scheduler: NoteScheduler,
        allocator: VoiceAllocator,
        transport: Transport,
        events: EventQueue,
        bank: Bank,
    }

    impl Rig {
        fn new() -> Self {
            let config = EngineConfig::default();
            let mut transport = Transport::new();
            transport.begin_play(None);
            Self {
                scheduler: NoteScheduler::new(config.lookahead),
                allocator: VoiceAllocator::new(&config),
                transport,
                events: EventQueue::new(),
                bank: bank(),
            }
        }

        fn tick(&mut self, now: f64, song: &Song) -> TickReport {
            self.scheduler.tick(
                now,
                song,
                &mut self.allocator,
                &self.bank,
                &mut self.transport,
                &mut self.events,
            )
        }

        fn start_times(&mut self) -> Vec<f64> {
            let mut out = Vec::new();
            self.events.drain_due(f64::INFINITY, &mut out);
            out.iter().map(|e| e.time).collect()
        }
    }

    fn song(notes: Vec<Note>) -> Song {
        Song::from_notes("test", Timing::default(), notes)
    }

    fn m0(key: i32, start: u64, len: u32) -> Note {
        Note::new(key, InstrumentId::Melodic(0), start, len)
    }

    #[test]
    fn idle_scheduler_does_nothing() {
        let mut rig = Rig::new();
        let song = song(vec![m0(240, 0, 192)]);
        assert_eq!(rig.tick(0.0, &song), TickReport::default());
    }

    #[test]
    fn schedules_one_measure_ahead_of_now() {
        let mut rig = Rig::new();
        let song = song(vec![m0(240, 0, 192)]);
        rig.scheduler.begin(0.0, 0);
        let report = rig.tick(0.0, &song);
        assert_eq!(report.measures, 1);
        assert_eq!(report.dispatched, 1);
        assert_eq!(rig.scheduler.cursor(), Some(ScheduleCursor { time: 2.0, measure: 1 }));

        // ticks inside the same measure are no-ops
        assert_eq!(rig.tick(0.05, &song).measures, 0);
        assert_eq!(rig.tick(1.85, &song).measures, 0);
        assert_eq!(rig.tick(1.95, &song).measures, 1);
    }

    #[test]
    fn scenario_single_note_at_song_start() {
        let mut rig = Rig::new();
        let song = song(vec![m0(240, 0, 192).with_velocity(100)]);
        rig.scheduler.begin(0.0, 0);
        rig.tick(0.0, &song);

        assert_eq!(rig.allocator.active_count(), 1);
        let (_, voice) = rig.allocator.iter().next().unwrap();
        assert_eq!(voice.start_time, 0.0);
        assert_eq!(voice.increment, rig.allocator.pitch().rate_for(240, 0));
        let expected = 10f32.powf(((200.0 - 255.0) * 8.0) / 2000.0);
        assert!((voice.gain.value_at(0.5) - expected).abs() < 1e-5);
        assert_eq!(gain_for_velocity(100), voice.gain.value_at(1.0));
        assert!((voice.stop_time.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn overlapping_notes_on_one_key() {
        let mut rig = Rig::new();
        let song = song(vec![m0(100, 0, 192), m0(100, 48, 96)]);
        rig.scheduler.begin(0.0, 0);
        rig.tick(0.0, &song);

        let starts = rig.start_times();
        assert_eq!(starts, vec![0.0, 0.5]);
        let owner = rig.allocator.voice_for_key(100).unwrap();
        assert_eq!(rig.allocator.get(owner).unwrap().start_time, 0.5);
        let retired: Vec<_> = rig.allocator.iter().filter(|(h, _)| *h != owner).collect();
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].1.loop_until, Some(0.5));
    }

    #[test]
    fn loop_wraps_to_window_start() {
        let mut rig = Rig::new();
        // one note in measure 1
        let song = song(vec![m0(100, 192, 48)]);
        rig.scheduler.set_loop_window(LoopWindow::new(true, 0, 4).unwrap());
        rig.scheduler.begin(0.0, 0);
        let mut now = 0.0;
        while now < 12.0 {
            rig.tick(now, &song);
            now += 0.05;
        }
        // schedule measure 5 wraps to display measure 1
        assert_eq!(rig.transport.current_measure(10.5), 1);
        let starts = rig.start_times();
        assert_eq!(starts.len(), 2);
        assert!((starts[0] - 2.0).abs() < 1e-9);
        assert!((starts[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn disabled_loop_exhausts_at_song_end() {
        let mut rig = Rig::new();
        let song = song(vec![m0(100, 0, 48)]);
        rig.scheduler.begin(0.0, 0);
        let report = rig.tick(20.0, &song);
        // four-measure minimum, everything but measure 0's note is late
        assert_eq!(report.measures, 4);
        assert_eq!(report.skipped_late, 1);
        assert!(rig.scheduler.is_exhausted());
        assert_eq!(rig.tick(30.0, &song), TickReport::default());
    }

    #[test]
    fn late_tick_catches_up_and_skips_past_notes() {
        let mut rig = Rig::new();
        let song = song(vec![m0(100, 0, 48), m0(101, 96, 48), m0(102, 192 + 96, 48)]);
        rig.scheduler.begin(0.0, 0);
        // first tick arrives at 1.95s: both measure 0 notes are late and the
        // horizon already reaches measure 1
        let report = rig.tick(1.95, &song);
        assert_eq!(report.measures, 2);
        assert_eq!(report.skipped_late, 2);
        assert_eq!(report.dispatched, 1);
        assert_eq!(rig.start_times(), vec![3.0]);
    }

    #[test]
    fn hidden_tracks_are_not_scheduled() {
        let mut rig = Rig::new();
        let song = song(vec![m0(100, 0, 48), Note::new(100, InstrumentId::Drum(1), 0, 48)]);
        rig.scheduler.set_hidden(InstrumentId::Melodic(0), true);
        assert!(rig.scheduler.is_hidden(InstrumentId::Melodic(0)));
        rig.scheduler.begin(0.0, 0);
        assert_eq!(rig.tick(0.0, &song).dispatched, 1);
        assert!(rig.allocator.iter().all(|(_, v)| v.is_drum()));
    }

    #[test]
    fn halt_freezes_cursor() {
        let mut rig = Rig::new();
        let song = song(vec![m0(100, 0, 48)]);
        rig.scheduler.begin(0.0, 0);
        rig.scheduler.halt();
        assert!(!rig.scheduler.is_running());
        assert_eq!(rig.tick(0.0, &song).measures, 0);
    }

    #[test]
    fn loop_change_rebases_cursor() {
        let mut rig = Rig::new();
        let song = song(Vec::new());
        rig.scheduler.set_loop_window(LoopWindow::new(true, 0, 2).unwrap());
        rig.scheduler.begin(0.0, 0);
        rig.tick(5.0, &song);
        // schedule measure 3 sounds as measure 1 under the 0..2 loop
        assert_eq!(rig.scheduler.cursor().unwrap().measure, 3);
        rig.scheduler.set_loop_window(LoopWindow::new(true, 0, 8).unwrap());
        assert_eq!(rig.scheduler.cursor().unwrap().measure, 1);
    }

    #[test]
    fn inverted_loop_window_is_rejected() {
        let mut rig = Rig::new();
        let song = song(vec![m0(100, 0, 48)]);
        assert!(rig.scheduler.set_loop_window(LoopWindow::new(true, 0, 2).unwrap()));
        rig.scheduler.begin(0.0, 0);
        rig.tick(3.0, &song);
        let before = rig.scheduler.cursor().unwrap();

        let inverted = LoopWindow { enabled: true, start_measure: 5, end_measure: 2 };
        assert!(!rig.scheduler.set_loop_window(inverted));
        assert_eq!(rig.scheduler.cursor().unwrap(), before);

        // the 0..2 loop is still in force
        let mut now = 3.0;
        while now < 9.0 {
            rig.tick(now, &song);
            now += 0.05;
        }
        assert_eq!(rig.transport.current_measure(8.5), 0);
        let starts = rig.start_times();
        assert_eq!(starts.len(), 2);
        assert!((starts[0] - 4.0).abs() < 1e-9);
        assert!((starts[1] - 8.0).abs() < 1e-9);
    }
}
