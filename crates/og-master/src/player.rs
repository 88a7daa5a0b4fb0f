//! The player thread: sole owner of the engine while a song plays.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use og_audio::{AudioError, AudioOutput};
use og_engine::{Engine, EngineConfig, Frame, TimedEvent, TransportState};
use og_formats::WavetableStore;
use og_ir::{InstrumentId, Song};
use ringbuf::traits::{Consumer, Producer};
use ringbuf::{HeapCons, HeapProd};

/// Builds the output device on the player thread.
pub type OutputFactory =
    Arc<dyn Fn(&EngineConfig) -> Result<Box<dyn AudioOutput>, AudioError> + Send + Sync>;

/// A control call forwarded from the controller to the player thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlCommand {
    Play(Option<u32>),
    Pause,
    SetVolume(u8),
    SetTempo(f64),
    SetLoop { enabled: bool, start: u32, end: u32 },
    SetTrackVisibility(InstrumentId, bool),
}

/// State the player publishes for the controller to read.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub stop: AtomicBool,
    pub finished: AtomicBool,
    state: AtomicU8,
    pub measure: AtomicU32,
    pub voices: AtomicUsize,
}

impl Shared {
    pub fn state(&self) -> TransportState {
        match self.state.load(Ordering::Relaxed) {
            1 => TransportState::Playing,
            2 => TransportState::Paused,
            _ => TransportState::Stopped,
        }
    }

    fn publish(&self, engine: &Engine) {
        let state = match engine.state() {
            TransportState::Stopped => 0,
            TransportState::Playing => 1,
            TransportState::Paused => 2,
        };
        self.state.store(state, Ordering::Relaxed);
        self.measure.store(engine.current_measure(), Ordering::Relaxed);
        self.voices.store(engine.active_voices(), Ordering::Relaxed);
    }
}

/// Song-independent settings a fresh engine starts from.
#[derive(Clone, Debug)]
pub(crate) struct Settings {
    pub volume: u8,
    pub loop_enabled: bool,
    pub loop_start: u32,
    pub loop_end: u32,
    pub hidden: Vec<InstrumentId>,
}

impl Default for Settings {
    fn default() -> Self {
        Self { volume: 100, loop_enabled: false, loop_start: 0, loop_end: 4, hidden: Vec::new() }
    }
}

/// Everything the player thread takes ownership of.
pub(crate) struct PlayerSetup {
    pub config: EngineConfig,
    pub song: Song,
    pub settings: Settings,
    pub from_measure: Option<u32>,
    pub store: Arc<WavetableStore>,
    pub output: OutputFactory,
    pub commands: HeapCons<ControlCommand>,
    pub events: HeapProd<TimedEvent>,
    pub shared: Arc<Shared>,
}

/// Build an engine for `song` with the controller's current settings.
pub(crate) fn prepare_engine(config: EngineConfig, song: Song, settings: &Settings) -> Engine {
    let mut engine = Engine::new(config);
    engine.load_song(song);
    engine.set_volume(settings.volume);
    engine.set_loop(settings.loop_enabled, settings.loop_start, settings.loop_end);
    for &instrument in &settings.hidden {
        engine.set_track_visibility(instrument, false);
    }
    engine
}

pub(crate) fn apply(engine: &mut Engine, command: ControlCommand) {
    match command {
        ControlCommand::Play(from) => {
            engine.play(from);
        }
        ControlCommand::Pause => {
            engine.pause();
        }
        ControlCommand::SetVolume(v) => engine.set_volume(v),
        ControlCommand::SetTempo(bpm) => engine.set_tempo(bpm),
        ControlCommand::SetLoop { enabled, start, end } => {
            engine.set_loop(enabled, start, end);
        }
        ControlCommand::SetTrackVisibility(instrument, visible) => {
            engine.set_track_visibility(instrument, visible)
        }
    }
}

pub(crate) fn run(setup: PlayerSetup) {
    let PlayerSetup {
        config,
        song,
        settings,
        from_measure,
        store,
        output,
        mut commands,
        mut events,
        shared,
    } = setup;

    let mut output = match output(&config) {
        Ok(output) => output,
        Err(e) => {
            log::error!("audio output unavailable: {}", e);
            shared.finished.store(true, Ordering::Relaxed);
            return;
        }
    };

    let config = config.with_sample_rate(output.sample_rate());
    let mut engine = prepare_engine(config, song, &settings);
    engine.play(from_measure);
    shared.publish(&engine);

    if let Err(e) = output.start() {
        log::error!("failed to start audio output: {}", e);
        shared.finished.store(true, Ordering::Relaxed);
        return;
    }

    let block = config.poll_frames().max(64);
    let mut buf = vec![Frame::silence(); block];
    let mut dropped = 0usize;

    while !shared.stop.load(Ordering::Relaxed) {
        while let Some(command) = commands.try_pop() {
            apply(&mut engine, command);
        }
        if engine.is_finished() {
            log::info!("playback finished at {:.2}s", engine.now());
            break;
        }

        let room = output.available().min(block);
        if room == 0 {
            std::thread::sleep(Duration::from_millis(1));
            continue;
        }
        engine.process(&*store, &mut buf[..room]);
        if let Err(e) = output.write(&buf[..room]) {
            log::error!("audio write failed: {}", e);
            break;
        }
        for event in engine.take_events() {
            if events.try_push(event).is_err() {
                dropped += 1;
            }
        }
        shared.publish(&engine);
    }

    if dropped > 0 {
        log::debug!("{} playback events dropped, nobody polled them", dropped);
    }
    let killed = engine.stop();
    log::debug!("player stopped, {} voices killed", killed);
    if let Err(e) = output.stop() {
        log::warn!("failed to stop audio output: {}", e);
    }
    shared.publish(&engine);
    shared.finished.store(true, Ordering::Relaxed);
}
