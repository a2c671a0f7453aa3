//! End-to-end offline rendering from an authoring directory

use loopweave_audio::FsSourceLoader;
use loopweave_cli::{describe_track, render, write_wav, RenderPlan};
use loopweave_core::Catalog;
use loopweave_playback::{Engine, EngineConfig, EngineState, ManualClock};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const RATE: u32 = 8_000;

fn write_clip(path: &Path, seconds: f64, level: i16) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (seconds * f64::from(RATE)) as usize;
    for _ in 0..frames * 2 {
        writer.write_sample(level).unwrap();
    }
    writer.finalize().unwrap();
}

/// Arena: `Start` plays Intro (1s) into a 2s steady Loop; `Battle` loops Fight
fn arena(root: &Path) {
    let track_dir = root.join("tracks").join("Arena");
    fs::create_dir_all(&track_dir).unwrap();
    write_clip(&track_dir.join("intro.wav"), 1.0, 8_192);
    write_clip(&track_dir.join("loop.wav"), 2.0, 16_384);
    write_clip(&track_dir.join("fight.wav"), 1.0, 24_576);

    fs::write(
        root.join("trackData.json"),
        r#"{ "tracks": { "Arena": { "allClips": ["Intro", "Loop", "Fight"], "firstSection": "Start", "basePath": "/tracks/Arena" } } }"#,
    )
    .unwrap();
    fs::write(
        track_dir.join("clipData.json"),
        r#"{ "clips": {
            "Intro": { "file": "intro.wav", "nextClip": "Loop" },
            "Loop": { "file": "loop.wav" },
            "Fight": { "file": "fight.wav" }
        } }"#,
    )
    .unwrap();
    fs::write(
        track_dir.join("sectionData.json"),
        r#"{ "sections": {
            "Start": { "firstClip": "Intro", "nextSection": "Battle" },
            "Battle": { "firstClip": "Fight" }
        } }"#,
    )
    .unwrap();
}

fn engine(root: &Path) -> (Engine, ManualClock) {
    let catalog = Catalog::load_dir(root).unwrap();
    let clock = ManualClock::new();
    let engine = Engine::new(
        Arc::new(catalog),
        Box::new(FsSourceLoader::new(root)),
        Box::new(clock.clone()),
        EngineConfig::default(),
    );
    (engine, clock)
}

fn sample_at(samples: &[f32], seconds: f64) -> f32 {
    samples[(seconds * f64::from(RATE)) as usize * 2]
}

#[test]
fn test_inspect_authoring_directory() {
    let dir = tempfile::tempdir().unwrap();
    arena(dir.path());
    let catalog = Catalog::load_dir(dir.path()).unwrap();

    let text = describe_track(&catalog, "Arena").unwrap();

    assert!(text.contains("base path: /tracks/Arena"));
    assert!(text.contains("Start enters Intro"));
    assert!(text.contains("-> Battle"));
    assert!(text.contains("Intro: intro.wav"));
}

#[test]
fn test_render_scripted_session() {
    let dir = tempfile::tempdir().unwrap();
    arena(dir.path());
    let (mut engine, clock) = engine(dir.path());

    let mut plan = RenderPlan::new("Arena", 6.0);
    plan.queue = vec!["2.5:Battle".parse().unwrap()];
    plan.stop_at = Some(5.0);
    plan.fade = false;

    let rendered = render(&mut engine, &clock, &plan, RATE, 256).unwrap();

    assert_eq!(rendered.frames(), 6 * RATE as usize);
    assert!(rendered.errors.is_empty(), "{:?}", rendered.errors);

    let timeline: Vec<(f64, &str)> = rendered
        .clips
        .iter()
        .map(|(at, clip)| (*at, clip.as_str()))
        .collect();
    assert_eq!(timeline.len(), 3);
    assert_eq!(timeline[0], (0.0, "Intro"));
    assert_eq!(timeline[1].1, "Loop");
    assert!((timeline[1].0 - 1.0).abs() < 1.0 / f64::from(RATE));
    assert_eq!(timeline[2].1, "Fight");
    assert!((timeline[2].0 - 3.0).abs() < 1.0 / f64::from(RATE));

    assert!((sample_at(&rendered.samples, 0.5) - 0.25).abs() < 1e-3);
    assert!((sample_at(&rendered.samples, 2.0) - 0.5).abs() < 1e-3);
    assert!((sample_at(&rendered.samples, 4.0) - 0.75).abs() < 1e-3);
    assert!(rendered.samples[5 * RATE as usize * 2..]
        .iter()
        .all(|s| *s == 0.0));

    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(engine.current_section(), Some("Start"));
}

#[test]
fn test_rejected_cue_does_not_abort_render() {
    let dir = tempfile::tempdir().unwrap();
    arena(dir.path());
    let (mut engine, clock) = engine(dir.path());

    let mut plan = RenderPlan::new("Arena", 2.0);
    plan.queue = vec!["0.5:Nowhere".parse().unwrap()];

    let rendered = render(&mut engine, &clock, &plan, RATE, 512).unwrap();

    assert_eq!(rendered.frames(), 2 * RATE as usize);
    assert_eq!(rendered.errors.len(), 1);
    assert_eq!(engine.state(), EngineState::Playing);
}

#[test]
fn test_unknown_track_fails_render() {
    let dir = tempfile::tempdir().unwrap();
    arena(dir.path());
    let (mut engine, clock) = engine(dir.path());

    let plan = RenderPlan::new("Desert", 2.0);
    assert!(render(&mut engine, &clock, &plan, RATE, 512).is_err());
}

#[test]
fn test_wav_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    arena(dir.path());
    let (mut engine, clock) = engine(dir.path());
    let rendered = render(&mut engine, &clock, &RenderPlan::new("Arena", 1.5), RATE, 512).unwrap();

    let out = dir.path().join("session.wav");
    write_wav(&out, &rendered.samples, rendered.sample_rate).unwrap();

    let mut reader = hound::WavReader::open(&out).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, RATE);
    let samples: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
    assert_eq!(samples, rendered.samples);
}
