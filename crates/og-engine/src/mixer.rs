//! Main playback engine.
//!
//! `Engine` owns everything the player thread mutates: the song, transport,
//! scheduler, voice pool and the render clock. The render clock counts output
//! frames and is the only notion of time; it advances whenever frames are
//! rendered, regardless of transport state, so pausing lets already sounding
//! voices ring out on schedule.

use alloc::vec::Vec;
use og_ir::{InstrumentId, LoopWindow, SampleSource, Song, Track};

use crate::config::EngineConfig;
use crate::event_queue::{EventQueue, TimedEvent};
use crate::frame::Frame;
use crate::scheduler::{NoteScheduler, TickReport};
use crate::transport::{Transport, TransportState};
use crate::voice_pool::VoiceAllocator;

/// The main playback engine.
pub struct Engine {
    config: EngineConfig,
    song: Song,
    transport: Transport,
    scheduler: NoteScheduler,
    allocator: VoiceAllocator,
    /// Pending note-start notifications
    events: EventQueue,
    /// Notifications whose time has been rendered, waiting for the host
    fired: Vec<TimedEvent>,
    /// Frames rendered since creation
    clock: u64,
    /// Frames left until the next scheduler tick in `process`
    until_tick: usize,
    master_volume: f32,
}

impl Engine {
    /// Create an engine with an empty song.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            scheduler: NoteScheduler::new(config.lookahead),
            allocator: VoiceAllocator::new(&config),
            config,
            song: Song::default(),
            transport: Transport::new(),
            events: EventQueue::new(),
            fired: Vec::new(),
            clock: 0,
            until_tick: 0,
            master_volume: 1.0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Replace the song. Playback stops first.
    pub fn load_song(&mut self, song: Song) {
        self.stop();
        log::info!(
            "loaded \"{}\": {} notes, {} measures",
            song.title,
            song.notes().len(),
            song.length_measures()
        );
        self.song = song;
    }

    /// Render-clock time in seconds.
    pub fn now(&self) -> f64 {
        self.clock as f64 / self.config.sample_rate as f64
    }

    pub fn state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Measure sounding at the render clock.
    pub fn current_measure(&self) -> u32 {
        self.transport.current_measure(self.now())
    }

    /// Start or resume playback. Returns false if already playing.
    pub fn play(&mut self, from_measure: Option<u32>) -> bool {
        let now = self.now();
        let Some(measure) = self.transport.begin_play(from_measure) else {
            return false;
        };
        log::debug!("play from measure {} at {:.3}s", measure, now);
        self.scheduler.begin(now, measure);
        self.until_tick = 0;
        true
    }

    /// Freeze the transport. Voices already sounding ring out; anything
    /// scheduled past the render clock is cancelled.
    pub fn pause(&mut self) -> bool {
        let now = self.now();
        if !self.transport.pause(now) {
            return false;
        }
        self.scheduler.halt();
        let cancelled = self.allocator.cancel_pending(now);
        self.events.retain(|e| e.time <= now);
        let measure = self.current_measure();
        log::debug!("paused at measure {}, cancelled {} pending voices", measure, cancelled);
        true
    }

    /// Stop and rewind to measure 0, killing every voice. Safe to call
    /// repeatedly; returns how many voices were killed.
    pub fn stop(&mut self) -> usize {
        self.transport.stop();
        self.scheduler.halt();
        self.events.clear();
        self.fired.clear();
        self.allocator.stop_all()
    }

    /// Master volume, 0-100.
    pub fn set_volume(&mut self, volume: u8) {
        self.master_volume = volume.min(100) as f32 / 100.0;
    }

    pub fn volume(&self) -> u8 {
        libm::roundf(self.master_volume * 100.0) as u8
    }

    /// Change the tempo. Measures not yet scheduled use the new tempo.
    pub fn set_tempo(&mut self, bpm: f64) {
        self.song.timing.set_bpm(bpm);
    }

    pub fn tempo(&self) -> f64 {
        self.song.timing.bpm
    }

    /// Set the loop window. An empty or inverted range is rejected.
    pub fn set_loop(&mut self, enabled: bool, start_measure: u32, end_measure: u32) -> bool {
        match LoopWindow::new(enabled, start_measure, end_measure) {
            Some(window) => self.scheduler.set_loop_window(window),
            None => {
                log::warn!(
                    "ignoring loop {}..{}: end must be after start",
                    start_measure, end_measure
                );
                false
            }
        }
    }

    pub fn loop_window(&self) -> LoopWindow {
        self.scheduler.loop_window()
    }

    /// Hidden tracks are skipped by the scheduler.
    pub fn set_track_visibility(&mut self, instrument: InstrumentId, visible: bool) {
        self.scheduler.set_hidden(instrument, !visible);
    }

    pub fn is_track_visible(&self, instrument: InstrumentId) -> bool {
        !self.scheduler.is_hidden(instrument)
    }

    pub fn tracks(&self) -> &[Track] {
        self.song.tracks()
    }

    pub fn allocator(&self) -> &VoiceAllocator {
        &self.allocator
    }

    pub fn active_voices(&self) -> usize {
        self.allocator.active_count()
    }

    /// Run one scheduler tick at the render clock.
    pub fn tick<S: SampleSource + ?Sized>(&mut self, bank: &S) -> TickReport {
        let now = self.now();
        self.scheduler.tick(
            now,
            &self.song,
            &mut self.allocator,
            bank,
            &mut self.transport,
            &mut self.events,
        )
    }

    /// Render frames, advancing the render clock. Does not schedule.
    pub fn render(&mut self, out: &mut [Frame]) {
        let rate = self.config.sample_rate as f64;
        for frame in out.iter_mut() {
            let t = self.clock as f64 / rate;
            let (left, right) = self.allocator.render_frame(t);
            *frame = Frame::from_f32(left * self.master_volume, right * self.master_volume);
            self.clock += 1;
        }
        let now = self.now();
        self.events.drain_due(now, &mut self.fired);
        self.allocator.reap_finished(now);
    }

    /// Render frames, ticking the scheduler every poll interval.
    pub fn process<S: SampleSource + ?Sized>(&mut self, bank: &S, out: &mut [Frame]) {
        let poll = self.config.poll_frames();
        let mut offset = 0;
        while offset < out.len() {
            if self.until_tick == 0 {
                self.tick(bank);
                self.until_tick = poll;
            }
            let len = self.until_tick.min(out.len() - offset);
            self.render(&mut out[offset..offset + len]);
            self.until_tick -= len;
            offset += len;
        }
    }

    /// Notifications whose time has been rendered.
    pub fn take_events(&mut self) -> Vec<TimedEvent> {
        core::mem::take(&mut self.fired)
    }

    /// The song ran out (loop off), the render clock passed its end and no
    /// voice remains.
    pub fn is_finished(&self) -> bool {
        self.transport.is_playing()
            && self.scheduler.is_exhausted()
            && self.allocator.is_empty()
            && self.scheduler.cursor().is_some_and(|c| c.time <= self.now())
    }
}
