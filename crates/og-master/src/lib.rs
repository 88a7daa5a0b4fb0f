//! Headless controller for the organelle playback core.
//!
//! Owns the wavetable bank, the current song and the player thread, and
//! exposes the control surface the editor and the CLI share. Control calls
//! are mirrored locally and forwarded to the player thread through a
//! lock-free command queue; the player is the only thread that touches the
//! engine while a song plays.

mod player;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use arrayvec::ArrayString;
use og_audio::{AudioError, AudioOutput, CpalOutput, NullOutput};
use og_engine::{EngineConfig, Frame, TimedEvent, TransportState};
use og_formats::{InstrumentList, LoadError, WavetableStore};
use og_ir::{InstrumentId, LoopWindow};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use player::{PlayerSetup, Settings, Shared};

// Re-export common types so callers don't need og-ir/og-engine directly.
pub use og_engine::PlaybackEvent;
pub use og_formats::{frames_to_wav, write_wav};
pub use og_ir::{Note, Song, Timing};
pub use player::{ControlCommand, OutputFactory};

const COMMAND_CAPACITY: usize = 256;
const EVENT_CAPACITY: usize = 4096;

/// One row of the track list shown by the editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackInfo {
    pub instrument: InstrumentId,
    pub name: ArrayString<16>,
    pub note_count: usize,
    pub visible: bool,
}

/// Headless controller: owns a bank and a song and manages playback.
pub struct Controller {
    config: EngineConfig,
    store: Arc<WavetableStore>,
    song: Song,
    settings: Settings,
    output: OutputFactory,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    commands: HeapProd<ControlCommand>,
    events: HeapCons<TimedEvent>,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    /// A controller with an empty bank that plays through the default
    /// audio device.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let lookahead = config.lookahead;
        Self {
            config,
            store: Arc::new(WavetableStore::default()),
            song: Song::new("Untitled"),
            settings: Settings::default(),
            output: Arc::new(move |_: &EngineConfig| -> Result<Box<dyn AudioOutput>, AudioError> {
                Ok(Box::new(CpalOutput::open(lookahead)?))
            }),
            playback: None,
        }
    }

    /// Swap the output backend used by future `play` calls.
    pub fn with_output(mut self, output: OutputFactory) -> Self {
        self.output = output;
        self
    }

    /// Discard audio, paced like a real device. For machines without sound.
    pub fn with_null_output(self) -> Self {
        self.with_output(Arc::new(
            |config: &EngineConfig| -> Result<Box<dyn AudioOutput>, AudioError> {
                let capacity = (config.sample_rate as f64 * config.lookahead) as usize;
                Ok(Box::new(NullOutput::new(config.sample_rate, capacity)))
            },
        ))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Bank ---

    /// Load the wavetable bank. Playback stops first.
    ///
    /// On failure the bank is left empty and every note plays silently; the
    /// error is returned here and nowhere else.
    pub fn init(&mut self, blob: Vec<u8>) -> Result<(), LoadError> {
        self.stop();
        let mut store = WavetableStore::default();
        let result = store.load(blob);
        if let Err(ref e) = result {
            log::error!("wavetable bank failed to load: {}", e);
        }
        self.store = Arc::new(store);
        result
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_loaded()
    }

    pub fn instruments(&self) -> InstrumentList {
        self.store.list_instruments()
    }

    // --- Song management ---

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Replace the song. Playback stops first; tempo comes from the song.
    pub fn load_song(&mut self, song: Song) {
        self.stop();
        self.song = song;
    }

    /// Per-instrument note counts and visibility.
    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.song
            .tracks()
            .iter()
            .map(|t| TrackInfo {
                instrument: t.instrument,
                name: t.name,
                note_count: t.note_count,
                visible: !self.settings.hidden.contains(&t.instrument),
            })
            .collect()
    }

    // --- Real-time playback ---

    /// Start playback from `from_measure` (0 if `None`), or resume if
    /// paused. Does nothing while already playing.
    pub fn play(&mut self, from_measure: Option<u32>) {
        if self.player_alive() {
            self.send(ControlCommand::Play(from_measure));
            return;
        }
        self.stop();

        let (commands, command_rx) = HeapRb::<ControlCommand>::new(COMMAND_CAPACITY).split();
        let (event_tx, events) = HeapRb::<TimedEvent>::new(EVENT_CAPACITY).split();
        let shared = Arc::new(Shared::default());

        let setup = PlayerSetup {
            config: self.config,
            song: self.song.clone(),
            settings: self.settings.clone(),
            from_measure,
            store: self.store.clone(),
            output: self.output.clone(),
            commands: command_rx,
            events: event_tx,
            shared: shared.clone(),
        };

        let thread = match std::thread::Builder::new()
            .name("og-player".into())
            .spawn(move || player::run(setup))
        {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("failed to spawn player thread: {}", e);
                return;
            }
        };

        self.playback = Some(PlaybackHandle { commands, events, shared, thread: Some(thread) });
    }

    /// Freeze the transport. Sounding voices ring out.
    pub fn pause(&mut self) {
        self.send(ControlCommand::Pause);
    }

    /// Stop playback and wait for the player thread. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.shared.stop.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                if handle.join().is_err() {
                    log::error!("player thread panicked");
                }
            }
        }
    }

    pub fn state(&self) -> TransportState {
        match &self.playback {
            Some(pb) if !pb.shared.finished.load(Ordering::Relaxed) => pb.shared.state(),
            _ => TransportState::Stopped,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == TransportState::Playing
    }

    /// The player thread ran to the end of the song (or failed to start).
    pub fn is_finished(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.shared.finished.load(Ordering::Relaxed))
    }

    /// Measure currently sounding, `None` when stopped.
    pub fn position(&self) -> Option<u32> {
        match self.state() {
            TransportState::Stopped => None,
            _ => self.playback.as_ref().map(|pb| pb.shared.measure.load(Ordering::Relaxed)),
        }
    }

    pub fn active_voices(&self) -> usize {
        self.playback.as_ref().map_or(0, |pb| pb.shared.voices.load(Ordering::Relaxed))
    }

    /// Notifications the player produced since the last call.
    pub fn poll_events(&mut self) -> Vec<TimedEvent> {
        let Some(pb) = self.playback.as_mut() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        while let Some(event) = pb.events.try_pop() {
            out.push(event);
        }
        out
    }

    // --- Settings ---

    /// Master volume, 0-100.
    pub fn set_volume(&mut self, volume: u8) {
        let volume = volume.min(100);
        self.settings.volume = volume;
        self.send(ControlCommand::SetVolume(volume));
    }

    pub fn volume(&self) -> u8 {
        self.settings.volume
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.song.timing.set_bpm(bpm);
        self.send(ControlCommand::SetTempo(self.song.timing.bpm));
    }

    pub fn tempo(&self) -> f64 {
        self.song.timing.bpm
    }

    /// Set the loop window. A missing `start` or `end` keeps the current
    /// bound. Enabling with `end` not after `start` returns false and changes
    /// nothing; disabling always succeeds and keeps the last valid range.
    pub fn set_loop(&mut self, enabled: bool, start: Option<u32>, end: Option<u32>) -> bool {
        let start = start.unwrap_or(self.settings.loop_start);
        let end = end.unwrap_or(self.settings.loop_end);
        if LoopWindow::new(enabled, start, end).is_some() {
            self.settings.loop_start = start;
            self.settings.loop_end = end;
        } else if enabled {
            log::warn!("ignoring loop {}..{}: end must be after start", start, end);
            return false;
        } else {
            let (start, end) = (self.settings.loop_start, self.settings.loop_end);
            log::debug!("loop off, keeping range {}..{}", start, end);
        }
        self.settings.loop_enabled = enabled;
        self.send(ControlCommand::SetLoop {
            enabled,
            start: self.settings.loop_start,
            end: self.settings.loop_end,
        });
        true
    }

    pub fn loop_window(&self) -> LoopWindow {
        let settings = &self.settings;
        LoopWindow::new(settings.loop_enabled, settings.loop_start, settings.loop_end)
            .unwrap_or_default()
    }

    /// Hidden tracks are never scheduled.
    pub fn set_track_visibility(&mut self, instrument: InstrumentId, visible: bool) {
        self.settings.hidden.retain(|&i| i != instrument);
        if !visible {
            self.settings.hidden.push(instrument);
        }
        self.send(ControlCommand::SetTrackVisibility(instrument, visible));
    }

    // --- Offline rendering ---

    /// Render the song from measure 0 until it ends or `max_frames` frames
    /// have been produced. A looping song always runs to `max_frames`.
    pub fn render_frames(&self, sample_rate: u32, max_frames: usize) -> Vec<Frame> {
        let config = self.config.with_sample_rate(sample_rate);
        let mut engine = player::prepare_engine(config, self.song.clone(), &self.settings);
        engine.play(None);

        let block = config.poll_frames().max(1);
        let mut frames = Vec::with_capacity(max_frames);
        while !engine.is_finished() && frames.len() < max_frames {
            let len = block.min(max_frames - frames.len());
            let start = frames.len();
            frames.resize(start + len, Frame::silence());
            engine.process(&*self.store, &mut frames[start..]);
        }
        log::info!("rendered {} frames at {} Hz", frames.len(), sample_rate);
        frames
    }

    pub fn render_to_wav(&self, sample_rate: u32, max_seconds: u32) -> Vec<u8> {
        let max_frames = sample_rate as usize * max_seconds as usize;
        let frames = self.render_frames(sample_rate, max_frames);
        frames_to_wav(&frames, sample_rate)
    }

    fn player_alive(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| !p.shared.finished.load(Ordering::Relaxed))
    }

    fn send(&mut self, command: ControlCommand) {
        if !self.player_alive() {
            return;
        }
        if let Some(pb) = self.playback.as_mut() {
            if pb.commands.try_push(command).is_err() {
                log::warn!("player command queue full, dropped {:?}", command);
            }
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}
