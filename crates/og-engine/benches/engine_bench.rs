use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use og_engine::{Engine, EngineConfig, Frame, PitchModel};
use og_ir::{InstrumentId, Note, SampleKind, SampleSource, Song, Timing, WaveformSample};

struct SawBank(Arc<WaveformSample>);

impl SampleSource for SawBank {
    fn sample_for(&self, _: InstrumentId) -> Option<Arc<WaveformSample>> {
        Some(self.0.clone())
    }

    fn drum_count(&self) -> usize {
        0
    }
}

fn saw_bank() -> SawBank {
    let wave = (0..256).map(|i| i as f32 / 128.0 - 1.0).collect();
    SawBank(Arc::new(WaveformSample::with_data("saw", 0, SampleKind::Wavetable, wave)))
}

/// Sixteen-voice chords on every beat for eight measures.
fn dense_song() -> Song {
    let mut notes = Vec::new();
    for beat in 0..32u64 {
        for voice in 0..16 {
            notes.push(Note::new(120 + voice * 13, InstrumentId::Melodic(0), beat * 48, 48));
        }
    }
    Song::from_notes("bench", Timing::default(), notes)
}

fn bench_render(c: &mut Criterion) {
    let bank = saw_bank();
    let song = dense_song();
    let mut buf = vec![Frame::silence(); 2205];

    c.bench_function("render_dense_song_50ms", |b| {
        let mut engine = Engine::new(EngineConfig::default());
        engine.load_song(song.clone());
        engine.set_loop(true, 0, 8);
        engine.play(None);
        b.iter(|| engine.process(&bank, &mut buf));
    });
}

fn bench_pitch(c: &mut Criterion) {
    let pitch = PitchModel::new(44100);
    c.bench_function("rate_for_all_keys", |b| {
        b.iter(|| (0..576).map(|k| pitch.rate_for(k, 0)).sum::<f64>());
    });
}

criterion_group!(benches, bench_render, bench_pitch);
criterion_main!(benches);
