//! organelle CLI: headless playback and WAV export of the demo song.
//!
//! Usage:
//!   cargo run --bin og-cli -- path/to/wavetable.dat
//!   cargo run --bin og-cli -- path/to/wavetable.dat --wav output.wav --bpm 96 \
//!       --loop 0:2 --seconds 20

use og_ir::{InstrumentId, LoopPolicy};
use og_master::{Controller, Note, Song, Timing};
use std::io::Write;
use std::time::{Duration, Instant};
use std::{env, fs};

struct Args {
    bank: String,
    wav: Option<String>,
    bpm: Option<f64>,
    loop_range: Option<(u32, u32)>,
    seconds: u32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args().unwrap_or_else(|msg| {
        eprintln!("{}", msg);
        eprintln!("Usage: og-cli <wavetable.dat> [--wav out.wav] [--bpm n] [--loop start:end]");
        eprintln!("              [--seconds n]");
        std::process::exit(1);
    });

    let blob = fs::read(&args.bank).unwrap_or_else(|e| {
        log::error!("failed to read {}: {}", args.bank, e);
        std::process::exit(1);
    });
    log::info!("loaded {} ({} bytes)", args.bank, blob.len());

    let mut ctrl = Controller::new();
    // a bad bank still plays, silently
    if let Err(e) = ctrl.init(blob) {
        log::warn!("wavetable bank unusable: {}", e);
    }
    ctrl.load_song(demo_song());
    if let Some(bpm) = args.bpm {
        ctrl.set_tempo(bpm);
    }
    if let Some((start, end)) = args.loop_range {
        if !ctrl.set_loop(true, Some(start), Some(end)) {
            log::error!("invalid loop {}:{}", start, end);
            std::process::exit(1);
        }
    }

    let instruments = ctrl.instruments();
    println!("Title:    {}", ctrl.song().title);
    println!("Tempo:    {} BPM", ctrl.tempo());
    println!("Measures: {}", ctrl.song().length_measures());
    println!(
        "Bank:     {} waveforms, {} drums",
        instruments.melodic.len(),
        instruments.drums.len()
    );
    for track in ctrl.tracks() {
        println!("  {:<8} {} notes", track.name, track.note_count);
    }
    println!();

    match args.wav {
        Some(wav) => render_to_wav(&ctrl, &wav, args.seconds),
        None => play_audio(&mut ctrl, args.seconds),
    }
}

fn parse_args() -> Result<Args, String> {
    let mut it = env::args().skip(1);
    let mut args =
        Args { bank: String::new(), wav: None, bpm: None, loop_range: None, seconds: 60 };

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--wav" => args.wav = Some(it.next().ok_or("--wav needs a path")?),
            "--bpm" => {
                let v = it.next().ok_or("--bpm needs a value")?;
                args.bpm = Some(v.parse().map_err(|_| format!("bad tempo: {}", v))?);
            }
            "--loop" => {
                let v = it.next().ok_or("--loop needs start:end")?;
                let (start, end) = v.split_once(':').ok_or(format!("bad loop: {}", v))?;
                let parse = |s: &str| s.parse::<u32>().map_err(|_| format!("bad loop: {}", v));
                args.loop_range = Some((parse(start)?, parse(end)?));
            }
            "--seconds" => {
                let v = it.next().ok_or("--seconds needs a value")?;
                args.seconds = v.parse().map_err(|_| format!("bad duration: {}", v))?;
            }
            other if other.starts_with("--") => return Err(format!("unknown flag: {}", other)),
            other => args.bank = other.to_string(),
        }
    }

    if args.bank.is_empty() {
        return Err("missing wavetable bank".to_string());
    }
    Ok(args)
}

/// Four measures: an arpeggio over a held pad, a kick on every beat.
fn demo_song() -> Song {
    let timing = Timing::default();
    let beat = timing.ticks_per_beat as u64;
    let mut notes = Vec::new();

    for measure in 0..4u64 {
        let base = measure * timing.ticks_per_measure();
        notes.push(
            Note::new(216, InstrumentId::Melodic(3), base, 4 * beat as u32)
                .with_velocity(80)
                .with_volume_automation([(0, 60), (96, 100), (192, 40)]),
        );
        for (i, key) in [288, 318, 330, 360].into_iter().enumerate() {
            let pan = if i % 2 == 0 { -40 } else { 40 };
            notes.push(
                Note::new(key, InstrumentId::Melodic(10), base + i as u64 * beat, beat as u32 / 2)
                    .with_pan(pan)
                    .with_loop_policy(LoopPolicy::FiniteRepeats(2)),
            );
        }
        for b in 0..4 {
            notes.push(Note::new(144, InstrumentId::Drum(0), base + b * beat, beat as u32));
        }
    }
    Song::from_notes("Demo", timing, notes)
}

fn play_audio(ctrl: &mut Controller, seconds: u32) {
    ctrl.play(None);
    println!("Playing...");
    println!();

    let started = Instant::now();
    let deadline = started + Duration::from_secs(seconds as u64);
    while !ctrl.is_finished() && Instant::now() < deadline {
        if let Some(measure) = ctrl.position() {
            print!("\rMeasure: {:03} | Voices: {:03}", measure, ctrl.active_voices());
            let _ = std::io::stdout().flush();
        }
        let _ = ctrl.poll_events();
        std::thread::sleep(Duration::from_millis(10));
    }
    ctrl.stop();
    log::info!("playback stopped after {:.1}s", started.elapsed().as_secs_f64());

    println!("\rDone.                          ");
}

fn render_to_wav(ctrl: &Controller, path: &str, seconds: u32) {
    let sample_rate: u32 = 44100;
    println!("Rendering to {} at {} Hz...", path, sample_rate);

    let wav = ctrl.render_to_wav(sample_rate, seconds);
    println!("Rendered {} bytes", wav.len());

    fs::write(path, &wav).unwrap_or_else(|e| {
        log::error!("failed to write {}: {}", path, e);
        std::process::exit(1);
    });

    println!("Done.");
}
