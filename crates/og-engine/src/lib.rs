//! Playback engine for the organelle playback core.
//!
//! Turns a song's note stream into audio: a lookahead scheduler hands notes
//! to a voice pool a fixed interval ahead of the render clock, voices read
//! shared wavetables at the 72-EDO playback rate, and per-voice parameter
//! timelines carry attack, release and note automation.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod automation;
mod config;
mod event_queue;
mod frame;
mod mixer;
pub mod pitch;
pub mod scheduler;
mod transport;
mod voice;
mod voice_pool;

pub use automation::{gain_for_velocity, pan_position, AutomationEngine, ParamTimeline};
pub use config::{EngineConfig, EnvelopeShape};
pub use event_queue::{EventQueue, PlaybackEvent, TimedEvent};
pub use frame::Frame;
pub use mixer::Engine;
pub use pitch::PitchModel;
pub use scheduler::{NoteScheduler, TickReport};
pub use transport::{Transport, TransportState};
pub use voice::{pan_gains, Voice, VoiceKind, VoiceState};
pub use voice_pool::{resolve_instrument, VoiceAllocator, VoiceHandle, LOOP_CYCLES, MAX_VOICES};
