//! Offline session rendering
//!
//! Drives an engine on a [`ManualClock`] as fast as it can mix: the clock is
//! advanced by rendered frames, and blocks are cut at every timer deadline
//! and scripted cue so hand-offs land on the sample they are due.

use crate::error::{CliError, Result};
use loopweave_playback::{AudioClock, Engine, EngineEvent, ManualClock};
use std::collections::VecDeque;
use std::path::Path;
use std::str::FromStr;

/// A scripted queue request: `T:SECTION`
#[derive(Debug, Clone, PartialEq)]
pub struct QueueCue {
    /// Session time in seconds
    pub at: f64,
    /// Section to queue
    pub section: String,
}

impl FromStr for QueueCue {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        let (at, section) = s
            .split_once(':')
            .ok_or_else(|| CliError::InvalidArgument(format!("expected T:SECTION, got '{s}'")))?;
        let at: f64 = at
            .trim()
            .parse()
            .map_err(|_| CliError::InvalidArgument(format!("invalid cue time '{at}'")))?;
        if !at.is_finite() || at < 0.0 {
            return Err(CliError::InvalidArgument(format!(
                "cue time must be non-negative, got {at}"
            )));
        }
        let section = section.trim();
        if section.is_empty() {
            return Err(CliError::InvalidArgument(format!("missing section in '{s}'")));
        }
        Ok(Self {
            at,
            section: section.to_string(),
        })
    }
}

/// What to render
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub track: String,
    /// Section to start in; the track's entry section when absent
    pub section: Option<String>,
    pub seconds: f64,
    pub queue: Vec<QueueCue>,
    pub stop_at: Option<f64>,
    pub fade: bool,
}

impl RenderPlan {
    /// Plan playing `track` from its entry section for `seconds`
    pub fn new(track: impl Into<String>, seconds: f64) -> Self {
        Self {
            track: track.into(),
            section: None,
            seconds,
            queue: Vec::new(),
            stop_at: None,
            fade: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Cue {
    Queue(String),
    Stop { fade: bool },
}

/// Rendered audio plus the clip timeline
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Interleaved stereo samples
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// `(seconds, clip)` for every clip that started
    pub clips: Vec<(f64, String)>,
    /// Errors reported by the engine along the way
    pub errors: Vec<String>,
}

impl Rendered {
    /// Rendered length in frames
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }
}

/// Render `plan` with an engine whose clock is `clock`
///
/// The engine must be idle or ready; the plan's track is loaded first.
pub fn render(
    engine: &mut Engine,
    clock: &ManualClock,
    plan: &RenderPlan,
    sample_rate: u32,
    block_frames: usize,
) -> Result<Rendered> {
    if sample_rate == 0 || block_frames == 0 {
        return Err(CliError::InvalidArgument(
            "sample rate and block size must be positive".to_string(),
        ));
    }
    if !plan.seconds.is_finite() || plan.seconds <= 0.0 {
        return Err(CliError::InvalidArgument(format!(
            "render length must be positive, got {}",
            plan.seconds
        )));
    }

    let rate = f64::from(sample_rate);
    let start = clock.now();
    let mut rendered = Rendered {
        samples: Vec::new(),
        sample_rate,
        clips: Vec::new(),
        errors: Vec::new(),
    };

    engine.load_track(&plan.track)?;
    let section = match &plan.section {
        Some(section) => section.clone(),
        None => engine
            .current_section()
            .map(str::to_string)
            .ok_or_else(|| CliError::InvalidArgument("track has no entry section".to_string()))?,
    };
    engine.play_section(&section)?;
    collect(engine, start, &mut rendered);

    let mut cues = script(plan);
    let total = (plan.seconds * rate).round() as u64;
    let frame_at = |t: f64| ((t - start) * rate).ceil().max(0.0) as u64;
    let mut frame = 0_u64;
    rendered.samples.reserve(total as usize * 2);

    tracing::info!(
        track = %plan.track,
        section = %section,
        seconds = plan.seconds,
        sample_rate,
        "Rendering session"
    );

    while frame < total {
        let now = start + frame as f64 / rate;
        clock.set(now);

        while cues.front().is_some_and(|(at, _)| *at <= now - start) {
            if let Some((at, cue)) = cues.pop_front() {
                apply(engine, at, cue);
            }
        }
        engine.tick();
        collect(engine, start, &mut rendered);

        let mut end = (frame + block_frames as u64).min(total);
        if let Some(deadline) = engine.next_deadline() {
            end = end.min(frame_at(deadline).max(frame + 1));
        }
        if let Some((at, _)) = cues.front() {
            end = end.min(frame_at(start + at).max(frame + 1));
        }

        let offset = rendered.samples.len();
        rendered
            .samples
            .resize(offset + (end - frame) as usize * 2, 0.0);
        engine.render(now, sample_rate, &mut rendered.samples[offset..]);
        frame = end;
    }

    clock.set(start + total as f64 / rate);
    tracing::info!(
        frames = rendered.frames(),
        clips = rendered.clips.len(),
        "Render complete"
    );
    Ok(rendered)
}

fn script(plan: &RenderPlan) -> VecDeque<(f64, Cue)> {
    let mut cues: Vec<(f64, Cue)> = plan
        .queue
        .iter()
        .map(|cue| (cue.at, Cue::Queue(cue.section.clone())))
        .collect();
    if let Some(at) = plan.stop_at {
        cues.push((at, Cue::Stop { fade: plan.fade }));
    }
    cues.sort_by(|a, b| a.0.total_cmp(&b.0));
    cues.into()
}

fn apply(engine: &mut Engine, at: f64, cue: Cue) {
    let result = match &cue {
        Cue::Queue(section) => engine.queue_section_transition(section),
        Cue::Stop { fade } => engine.stop(*fade),
    };
    match result {
        Ok(()) => tracing::info!(at, ?cue, "Cue applied"),
        Err(e) => tracing::warn!(at, ?cue, error = %e, "Cue rejected"),
    }
}

fn collect(engine: &mut Engine, start: f64, rendered: &mut Rendered) {
    let at = engine.now() - start;
    for event in engine.drain_events() {
        match event {
            EngineEvent::ClipStarted { clip, section } => {
                tracing::info!(at, clip = %clip, section = %section, "Clip started");
                rendered.clips.push((at, clip));
            }
            EngineEvent::Error { message } => rendered.errors.push(message),
            other => tracing::debug!(at, event = ?other, "Engine event"),
        }
    }
}

/// Write interleaved stereo samples as 32-bit float WAV
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    tracing::info!(path = %path.display(), frames = samples.len() / 2, "WAV written");
    Ok(())
}
