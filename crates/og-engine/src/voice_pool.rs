//! Voice allocation and lifecycle management.
//!
//! Melodic voices own a key slot: at most one voice per key is `Active` at any
//! instant. A new note on a sounding key retires the old voice (it stops
//! looping and plays out its current cycle) and takes the slot immediately.
//! Drum voices never own a slot and are only cut short by `stop_all`.

use alloc::sync::Arc;
use alloc::vec::Vec;
use og_ir::{
    clamp_key, InstrumentId, LoopPolicy, Note, SampleSource, WaveformSample, KEYS_PER_OCTAVE,
    KEY_COUNT, MELODIC_COUNT,
};
use slotmap::SlotMap;

use crate::automation::{gain_for_velocity, pan_position, AutomationEngine};
use crate::config::{EngineConfig, EnvelopeShape};
use crate::pitch::PitchModel;
use crate::voice::{Voice, VoiceKind, VoiceState};

slotmap::new_key_type! {
    /// Generational handle to a voice in the pool.
    pub struct VoiceHandle;
}

/// Maximum number of simultaneous voices.
pub const MAX_VOICES: usize = 128;

/// Wave cycles per repeat for a finite loop, by octave.
pub const LOOP_CYCLES: [u32; 8] = [4, 8, 12, 16, 20, 24, 28, 32];

/// Pool of voices plus the key table.
pub struct VoiceAllocator {
    voices: SlotMap<VoiceHandle, Voice>,
    keys: [Option<VoiceHandle>; KEY_COUNT],
    pitch: PitchModel,
    envelope: EnvelopeShape,
    capacity: usize,
}

impl VoiceAllocator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            voices: SlotMap::with_capacity_and_key(config.max_voices),
            keys: [None; KEY_COUNT],
            pitch: PitchModel::new(config.sample_rate),
            envelope: config.envelope,
            capacity: config.max_voices.max(1),
        }
    }

    pub fn pitch(&self) -> &PitchModel {
        &self.pitch
    }

    /// Start a voice for `note` at render-clock time `when`.
    ///
    /// Returns `None` when the bank has no buffer for the instrument; the
    /// note is then silent.
    pub fn start<S: SampleSource + ?Sized>(
        &mut self,
        note: &Note,
        when: f64,
        seconds_per_tick: f64,
        bank: &S,
    ) -> Option<VoiceHandle> {
        let key = clamp_key(note.key as i32);
        let instrument = resolve_instrument(note.instrument, bank.drum_count());
        let Some(sample) = bank.sample_for(instrument) else {
            log::debug!("no sample for {:?}, note is silent", instrument);
            return None;
        };
        if !self.make_room() {
            log::debug!("voice pool full of drums, dropping note on key {}", key);
            return None;
        }
        let duration = note.duration_ticks as f64 * seconds_per_tick;

        let voice = match instrument {
            InstrumentId::Drum(_) => {
                let increment = PitchModel::drum_rate_for(key as i32) * sample.sample_rate as f64
                    / self.pitch.sample_rate() as f64;
                let mut voice =
                    Voice::new(key, instrument, VoiceKind::Drum, sample, increment, when);
                voice.gain.set_value_at(when, gain_for_velocity(note.velocity as i32));
                voice.pan.set_value_at(when, pan_position(note.pan as i32));
                voice
            }
            InstrumentId::Melodic(_) => {
                if let Some(old) = self.keys[key as usize].take() {
                    if let Some(prev) = self.voices.get_mut(old) {
                        prev.retire(when);
                    }
                }
                let timing = (when, duration, seconds_per_tick);
                self.melodic_voice(note, key, instrument, sample, timing)
            }
        };

        let is_melodic = voice.kind == VoiceKind::Melodic;
        let handle = self.voices.insert(voice);
        if is_melodic {
            self.keys[key as usize] = Some(handle);
        }
        Some(handle)
    }

    /// Build a melodic voice; `timing` is `(when, duration, seconds_per_tick)`.
    fn melodic_voice(
        &self,
        note: &Note,
        key: u16,
        instrument: InstrumentId,
        sample: Arc<WaveformSample>,
        timing: (f64, f64, f64),
    ) -> Voice {
        let (when, duration, seconds_per_tick) = timing;
        let increment = self.pitch.rate_for(key as i32, 0);
        let mut voice = Voice::new(key, instrument, VoiceKind::Melodic, sample, increment, when);
        voice.looping = true;

        let gain = gain_for_velocity(note.velocity as i32);
        if duration < self.envelope.short_note {
            voice.gain.set_value_at(when, gain);
        } else {
            voice.gain.set_value_at(when, 0.0);
            voice.gain.linear_ramp_to(when + self.envelope.attack, gain);
        }
        voice.pan.set_value_at(when, pan_position(note.pan as i32));
        AutomationEngine::new(seconds_per_tick).apply(note, when, &mut voice.gain, &mut voice.pan);

        if let LoopPolicy::FiniteRepeats(repeats) = note.loop_policy {
            let octave = (key / KEYS_PER_OCTAVE) as usize;
            let cycles = LOOP_CYCLES[octave] as f64 * repeats.max(1) as f64;
            let loop_duration = cycles / self.pitch.frequency_for(key as i32, 0);
            if loop_duration < duration {
                voice.stop_time = Some(when + loop_duration);
                voice.self_stopped = true;
            }
        }
        if !voice.self_stopped {
            let end = when + duration;
            voice.gain.hold_at(end - self.envelope.release_for(duration));
            voice.gain.linear_ramp_to(end, 0.0);
            voice.stop_time = Some(end);
        }
        voice
    }

    /// Ramp a voice out over the stop release starting at `when`.
    ///
    /// Drums ignore this; missing handles are ignored.
    pub fn stop(&mut self, handle: VoiceHandle, when: f64) {
        let release = self.envelope.stop_release;
        let Some(voice) = self.voices.get_mut(handle) else { return };
        if voice.is_drum() {
            return;
        }
        voice.release(when, release);
        let slot = &mut self.keys[voice.key as usize];
        if *slot == Some(handle) {
            *slot = None;
        }
    }

    /// Kill every voice immediately. Returns how many were killed.
    pub fn stop_all(&mut self) -> usize {
        let killed = self.voices.len();
        self.voices.clear();
        self.keys = [None; KEY_COUNT];
        if killed > 0 {
            log::debug!("stop_all killed {} voices", killed);
        }
        killed
    }

    /// Remove voices scheduled to start after `now` and give retiring voices
    /// their loop back when the note that displaced them never started.
    pub fn cancel_pending(&mut self, now: f64) -> usize {
        let before = self.voices.len();
        self.voices.retain(|_, v| v.start_time <= now);
        let cancelled = before - self.voices.len();
        self.clear_stale_keys();

        let mut restored: Vec<(VoiceHandle, u16, f64)> = Vec::new();
        for (handle, voice) in self.voices.iter_mut() {
            let displaced = voice.loop_until.is_some_and(|until| until > now);
            if displaced && voice.state == VoiceState::Retiring {
                voice.loop_until = None;
                voice.state = VoiceState::Active;
                restored.push((handle, voice.key, voice.start_time));
            }
        }
        // the most recent note on a key owns it
        restored.sort_by(|a, b| a.2.total_cmp(&b.2));
        for (handle, key, _) in restored {
            let slot = &mut self.keys[key as usize];
            if let Some(other) = *slot {
                if let Some(v) = self.voices.get_mut(other) {
                    v.retire(now);
                }
            }
            *slot = Some(handle);
        }
        cancelled
    }

    /// Remove voices that are done at `now`. Returns how many were removed.
    pub fn reap_finished(&mut self, now: f64) -> usize {
        let before = self.voices.len();
        self.voices.retain(|_, v| !v.is_done(now));
        let reaped = before - self.voices.len();
        if reaped > 0 {
            self.clear_stale_keys();
        }
        reaped
    }

    /// Mix one frame of every voice at render-clock `time`.
    pub fn render_frame(&mut self, time: f64) -> (f32, f32) {
        let mut left = 0.0;
        let mut right = 0.0;
        for voice in self.voices.values_mut() {
            let (l, r) = voice.render_frame(time);
            left += l;
            right += r;
        }
        (left, right)
    }

    pub fn get(&self, handle: VoiceHandle) -> Option<&Voice> {
        self.voices.get(handle)
    }

    pub fn get_mut(&mut self, handle: VoiceHandle) -> Option<&mut Voice> {
        self.voices.get_mut(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VoiceHandle, &Voice)> {
        self.voices.iter()
    }

    /// Voice currently owning `key`.
    pub fn voice_for_key(&self, key: u16) -> Option<VoiceHandle> {
        self.keys.get(key as usize).copied().flatten()
    }

    /// Count of occupied voice slots.
    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Free a slot if the pool is full. Returns false when every voice is
    /// an active drum, which only `stop_all` may end.
    fn make_room(&mut self) -> bool {
        if self.voices.len() < self.capacity {
            return true;
        }
        match self.find_steal_candidate() {
            Some(victim) => {
                log::debug!("voice pool full, stealing {:?}", victim);
                self.kill(victim);
                true
            }
            None => false,
        }
    }

    /// Best voice to steal: done/released, then retiring, then active
    /// melodic; oldest first within a class. Drums are never stolen.
    fn find_steal_candidate(&self) -> Option<VoiceHandle> {
        let priority = |v: &Voice| match v.state {
            VoiceState::Released | VoiceState::Finished => 0,
            VoiceState::Retiring => 1,
            VoiceState::Active => 2,
        };
        self.voices
            .iter()
            .filter(|(_, v)| !v.is_drum() || !v.playing)
            .min_by(|(_, a), (_, b)| {
                priority(a)
                    .cmp(&priority(b))
                    .then(a.start_time.total_cmp(&b.start_time))
            })
            .map(|(handle, _)| handle)
    }

    fn kill(&mut self, handle: VoiceHandle) {
        if let Some(voice) = self.voices.remove(handle) {
            let slot = &mut self.keys[voice.key as usize];
            if *slot == Some(handle) {
                *slot = None;
            }
        }
    }

    fn clear_stale_keys(&mut self) {
        for slot in self.keys.iter_mut() {
            if slot.is_some_and(|h| !self.voices.contains_key(h)) {
                *slot = None;
            }
        }
    }
}

/// Map out-of-range instruments onto melodic waveform 0.
pub fn resolve_instrument(instrument: InstrumentId, drum_count: usize) -> InstrumentId {
    match instrument {
        InstrumentId::Melodic(i) if i >= MELODIC_COUNT => {
            log::debug!("unknown melodic instrument {}, using 0", i);
            InstrumentId::Melodic(0)
        }
        InstrumentId::Drum(i) if i as usize >= drum_count => {
            log::debug!("unknown drum {}, using melodic 0", i);
            InstrumentId::Melodic(0)
        }
        other => other,
    }
}
