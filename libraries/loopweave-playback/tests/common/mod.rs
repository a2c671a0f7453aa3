//! Shared fixtures for engine tests

#![allow(dead_code)]

use loopweave_core::{AudioBuffer, AudioFormat, Catalog, Clip, Section, SectionKind, Track};
use loopweave_playback::{
    AudioClock, Engine, EngineConfig, EngineEvent, ManualClock, MemorySourceLoader,
    ScriptedPicker,
};
use std::sync::Arc;

/// Sample rate of every fixture buffer
pub const RATE: u32 = 100;

/// Value of every fixture sample
pub const LEVEL: f32 = 0.5;

pub fn constant(seconds: f64) -> AudioBuffer {
    let frames = (seconds * f64::from(RATE)).round() as usize;
    AudioBuffer::new(vec![LEVEL; frames * 2], AudioFormat::stereo(RATE))
}

/// Forest track:
///
/// - `Start` (Intro → Explore_a) leads to `Explore` and `Battle`
/// - `Explore` idles on Explore_a, which may move to Explore_b
/// - `Wander` is an auto section idling on Explore_a, auto-advancing to `Battle`
/// - `Battle` loops Battle_a steadily
/// - `Finale` is terminal: End_a decides at 10s and rings out to 12s
/// - `Elsewhere` enters a clip that is not part of the track
pub fn forest_catalog() -> Catalog {
    Catalog::new()
        .with_clip("Intro", Clip::new("intro.ogg").with_successors(["Explore_a"]))
        .with_clip(
            "Explore_a",
            Clip::new("explore_a.ogg").with_successors(["Explore_a", "Explore_b"]),
        )
        .with_clip(
            "Explore_b",
            Clip::new("explore_b.ogg").with_successors(["Explore_a"]),
        )
        .with_clip("Battle_a", Clip::new("battle_a.ogg"))
        .with_clip(
            "End_a",
            Clip::new("end_a.ogg").with_loop(0.0, 10.0).with_clip_end(12.0),
        )
        .with_clip("Foreign", Clip::new("foreign.ogg"))
        .with_section(
            "Start",
            Section::new("Intro").with_next(["Explore", "Battle"]),
        )
        .with_section(
            "Explore",
            Section::new("Explore_a").with_next(["Battle", "Finale"]),
        )
        .with_section(
            "Wander",
            Section::new("Explore_a")
                .with_kind(SectionKind::Auto)
                .with_next(["Battle", "Finale"]),
        )
        .with_section("Battle", Section::new("Battle_a").with_next(["Finale"]))
        .with_section(
            "Finale",
            Section::new("End_a").with_kind(SectionKind::Terminal),
        )
        .with_section("Elsewhere", Section::new("Foreign"))
        .with_track(
            "Forest",
            Track::new(
                "Start",
                ["Intro", "Explore_a", "Explore_b", "Battle_a", "End_a"],
            ),
        )
}

pub fn forest_loader() -> MemorySourceLoader {
    MemorySourceLoader::new()
        .with("intro.ogg", constant(4.0))
        .with("explore_a.ogg", constant(8.0))
        .with("explore_b.ogg", constant(8.0))
        .with("battle_a.ogg", constant(6.0))
        .with("end_a.ogg", constant(12.0))
        .with("foreign.ogg", constant(2.0))
}

pub struct Rig {
    pub engine: Engine,
    pub clock: ManualClock,
    pub loader: MemorySourceLoader,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_catalog(forest_catalog(), forest_loader(), EngineConfig::default())
    }

    pub fn with_catalog(catalog: Catalog, loader: MemorySourceLoader, config: EngineConfig) -> Self {
        let clock = ManualClock::new();
        let engine = Engine::new(
            Arc::new(catalog),
            Box::new(loader.clone()),
            Box::new(clock.clone()),
            config,
        )
        .with_picker(Box::new(ScriptedPicker::new(Vec::<String>::new())));
        Self {
            engine,
            clock,
            loader,
        }
    }

    /// Loaded forest rig with its load events drained
    pub fn loaded() -> Self {
        let mut rig = Self::new();
        rig.engine.load_track("Forest").unwrap();
        rig.engine.drain_events();
        rig
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Advance to `until`, firing every timer at its own deadline
    pub fn run_until(&mut self, until: f64) {
        while let Some(deadline) = self.engine.next_deadline() {
            if deadline > until {
                break;
            }
            self.clock.set(deadline);
            self.engine.tick();
        }
        self.clock.set(until);
        self.engine.tick();
    }

    /// Render interleaved stereo from now to `until` in `block` frame blocks
    ///
    /// Blocks are split at timer deadlines so hand-offs land on time.
    pub fn render_until(&mut self, until: f64, block: usize) -> Vec<f32> {
        let rate = f64::from(RATE);
        let mut out = Vec::new();
        loop {
            self.engine.tick();
            let now = self.now();
            if now >= until - 0.5 / rate {
                break;
            }
            let mut end = (now + block as f64 / rate).min(until);
            if let Some(deadline) = self.engine.next_deadline() {
                if deadline > now && deadline - now < 0.5 / rate {
                    self.clock.set(deadline);
                    continue;
                }
                if deadline > now {
                    end = end.min(deadline);
                }
            }
            let frames = ((end - now) * rate).round().max(1.0) as usize;
            let mut chunk = vec![0.0; frames * 2];
            self.engine.render(now, RATE, &mut chunk);
            out.extend_from_slice(&chunk);
            self.clock.advance_frames(frames, RATE);
        }
        out
    }

    pub fn events(&mut self) -> Vec<EngineEvent> {
        self.engine.drain_events()
    }
}

pub fn clips_started(events: &[EngineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::ClipStarted { clip, .. } => Some(clip.clone()),
            _ => None,
        })
        .collect()
}
