//! Engine - loop-boundary scheduling
//!
//! Coordinates the buffer cache, mixer, timers and successor picker for one
//! playback session. The engine never blocks: the host calls [`Engine::tick`]
//! to fire due timers and [`Engine::render`] to pull audio, both against the
//! same [`AudioClock`].

use crate::{
    cache::BufferCache,
    clock::AudioClock,
    error::{PlaybackError, Result},
    events::EngineEvent,
    mixer::{InstanceId, Mixer},
    picker::{RandomPicker, SuccessorPicker},
    progress,
    source::SourceLoader,
    timers::{DueTimer, TimerKind, TimerQueue},
    types::{EngineConfig, EngineState, PlaybackInfo, TransitionChoice, MAX_FADE_OUT_SECONDS},
};
use loopweave_core::{Catalog, CatalogError};
use std::sync::Arc;

/// Upper bound on timers fired by one tick
const MAX_TIMERS_PER_TICK: usize = 1024;

/// Adaptive music engine
///
/// Plays one track at a time:
/// - Sections are entered explicitly with `play_section`
/// - At each loop boundary the current clip either loops, hands off to a
///   queued section, or hands off to one of its successors
/// - `stop` fades out and resets to the track's entry section
///
/// State changes are reported through `drain_events`.
pub struct Engine {
    // Collaborators
    catalog: Arc<Catalog>,
    loader: Box<dyn SourceLoader>,
    clock: Box<dyn AudioClock>,
    picker: Box<dyn SuccessorPicker>,
    config: EngineConfig,

    // Resources
    cache: BufferCache,
    mixer: Mixer,
    timers: TimerQueue,

    // State
    state: EngineState,
    track: Option<String>,
    current_section: Option<String>,
    queued_section: Option<String>,
    auto_queued: bool,
    current_instance: Option<InstanceId>,
    fade_out_seconds: f64,

    // Event queue for host synchronization
    pending_events: Vec<EngineEvent>,
}

impl Engine {
    /// Create an idle engine
    pub fn new(
        catalog: Arc<Catalog>,
        loader: Box<dyn SourceLoader>,
        clock: Box<dyn AudioClock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            loader,
            clock,
            picker: Box::new(RandomPicker::new(config.seed)),
            cache: BufferCache::new(),
            mixer: Mixer::new(config.track_volume, config.listener_volume),
            timers: TimerQueue::new(),
            state: EngineState::Idle,
            track: None,
            current_section: None,
            queued_section: None,
            auto_queued: false,
            current_instance: None,
            fade_out_seconds: clamp_fade(config.fade_out_seconds),
            pending_events: Vec::new(),
            config,
        }
    }

    /// Replace the successor picker
    #[must_use]
    pub fn with_picker(mut self, picker: Box<dyn SuccessorPicker>) -> Self {
        self.picker = picker;
        self
    }

    // ===== Track lifecycle =====

    /// Load a track, replacing whatever was loaded
    ///
    /// Validates the track, decodes every clip of its clip set and positions
    /// the engine at the entry section in `Ready`. Loading while a stop fade
    /// is in progress abandons the fade and silences it at once.
    pub fn load_track(&mut self, name: &str) -> Result<()> {
        if self.state == EngineState::Stopping {
            tracing::info!(track = name, "Load requested during stop fade, abandoning fade");
        }
        self.release_resources();
        self.set_state(EngineState::Idle);

        self.load_fresh(name).map_err(|e| self.report(e))
    }

    /// Release buffers, live instances and timers
    pub fn unload_track(&mut self) -> Result<()> {
        if let Some(track) = self.track.as_deref() {
            tracing::info!(track, "Unloading track");
        }
        self.release_resources();
        self.set_state(EngineState::Idle);
        Ok(())
    }

    fn load_fresh(&mut self, name: &str) -> Result<()> {
        let track = self.catalog.validate_track(name)?;
        let entry = track.entry_section.clone();

        self.cache.load(
            &self.catalog,
            name,
            self.loader.as_ref(),
            self.config.source_mode.as_deref(),
        )?;

        self.track = Some(name.to_string());
        self.set_current_section(&entry);
        self.set_state(EngineState::Ready);
        self.pending_events.push(EngineEvent::Ready {
            track: name.to_string(),
            section: entry.clone(),
        });
        tracing::info!(track = name, section = %entry, "Track ready");
        Ok(())
    }

    fn release_resources(&mut self) {
        self.timers.cancel_all();
        self.mixer.clear();
        self.cache.clear();
        self.track = None;
        self.current_section = None;
        self.current_instance = None;
        self.set_queue(None, false);
    }

    // ===== Section control =====

    /// Switch to `name` now, starting its entry clip
    ///
    /// Clears any queued section and fades the superseded clip out over the
    /// hand-off fade. An unknown section is a logged no-op.
    pub fn play_section(&mut self, name: &str) -> Result<()> {
        self.play_section_inner(name).map_err(|e| self.report(e))
    }

    fn play_section_inner(&mut self, name: &str) -> Result<()> {
        match self.state {
            EngineState::Idle => return Err(PlaybackError::state("no track loaded")),
            EngineState::Stopping => return Err(PlaybackError::state("stop fade in progress")),
            EngineState::Ready | EngineState::Playing => {}
        }

        let entry = self
            .catalog
            .section(name)
            .map_err(|_| PlaybackError::section_not_found(name))?
            .entry_clip
            .clone();
        self.require_loaded(name, &entry)?;

        let now = self.clock.now();
        self.timers.cancel_kind(TimerKind::Reset);
        self.set_queue(None, false);
        if let Some(previous) = self.current_instance.take() {
            self.mixer
                .fade_out(previous, now, self.config.hand_off_fade_seconds);
        }

        tracing::info!(section = name, clip = %entry, "Playing section");
        self.set_current_section(name);
        self.start_clip(&entry, now)
    }

    /// Queue `name` to take over at the next loop boundary
    pub fn queue_section_transition(&mut self, name: &str) -> Result<()> {
        self.queue_inner(name).map_err(|e| self.report(e))
    }

    fn queue_inner(&mut self, name: &str) -> Result<()> {
        if self.state != EngineState::Playing {
            return Err(PlaybackError::state(format!(
                "cannot queue a transition while {}",
                self.state.label()
            )));
        }
        if self.catalog.section(name).is_err() {
            return Err(PlaybackError::section_not_found(name));
        }

        if self.auto_queued {
            return Err(PlaybackError::state(format!(
                "transition to '{}' is locked",
                self.queued_section.as_deref().unwrap_or_default()
            )));
        }
        if self.queued_section.as_deref() == Some(name) {
            return Ok(());
        }

        tracing::info!(section = name, "Transition queued");
        self.set_queue(Some(name.to_string()), false);
        Ok(())
    }

    /// Drop the queued section, if any
    ///
    /// Fails while an automatic transition is pending.
    pub fn clear_queued_section(&mut self) -> Result<()> {
        if self.auto_queued {
            let err = PlaybackError::state("automatic transition cannot be cleared");
            return Err(self.report(err));
        }
        if self.queued_section.is_some() {
            tracing::info!("Queued transition cleared");
            self.set_queue(None, false);
        }
        Ok(())
    }

    /// Fade everything out and return to the entry section
    ///
    /// With `with_fade` false or a zero fade-out duration the reset happens
    /// before this returns; otherwise it happens on the tick that completes
    /// the fade.
    pub fn stop(&mut self, with_fade: bool) -> Result<()> {
        match self.state {
            EngineState::Idle => {
                return Err(self.report(PlaybackError::state("no track loaded")));
            }
            EngineState::Ready => return Ok(()),
            EngineState::Stopping if with_fade => return Ok(()),
            EngineState::Playing | EngineState::Stopping => {}
        }

        let now = self.clock.now();
        let duration = if with_fade { self.fade_out_seconds } else { 0.0 };

        self.timers.cancel_all();
        self.set_queue(None, false);
        self.mixer.fade_out_all(now, duration);
        self.set_state(EngineState::Stopping);
        tracing::info!(duration, "Stopping");

        if duration > 0.0 {
            self.timers.schedule(now + duration, TimerKind::FadeComplete);
        } else {
            self.reset_track();
        }
        Ok(())
    }

    // ===== Clock-driven processing =====

    /// Fire every due timer in deadline order, then prune silent instances
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let mut fired = 0;

        while let Some(timer) = self.timers.pop_due(now) {
            fired += 1;
            if fired > MAX_TIMERS_PER_TICK {
                tracing::warn!(now, "Timer storm, deferring remaining timers to next tick");
                break;
            }
            self.fire(timer, now);
        }

        for id in self.mixer.prune(now) {
            if self.current_instance == Some(id) {
                self.current_instance = None;
            }
        }
    }

    /// Mix audible instances into interleaved stereo `out` starting at `start_time`
    pub fn render(&self, start_time: f64, sample_rate: u32, out: &mut [f32]) {
        self.mixer.render(start_time, sample_rate, out);
    }

    fn fire(&mut self, timer: DueTimer, now: f64) {
        match timer.kind {
            TimerKind::LoopBoundary { instance } => {
                self.on_loop_boundary(instance, timer.deadline, now);
            }
            TimerKind::Reset => {
                tracing::info!("Terminal section finished, resetting track");
                self.reset_track();
            }
            TimerKind::FadeComplete => {
                tracing::debug!("Stop fade complete");
                self.reset_track();
            }
        }
    }

    fn on_loop_boundary(&mut self, instance_id: InstanceId, boundary: f64, now: f64) {
        if self.current_instance != Some(instance_id) {
            tracing::debug!(instance_id, "Ignoring boundary of superseded instance");
            return;
        }
        let Some(instance) = self.mixer.instance(instance_id) else {
            return;
        };
        let clip = instance.clip.clone();
        let looping = instance.looping;
        let silence_at = instance.clip_end_after(boundary).max(now);
        tracing::debug!(clip = %clip, boundary, now, "Loop boundary");

        // 1. queued section
        if let Some(target) = self.queued_section.clone() {
            self.set_queue(None, false);
            match self.entry_of_loaded(&target) {
                Some(entry) => {
                    tracing::info!(section = %target, clip = %entry, "Taking queued transition");
                    self.release_outgoing(instance_id, boundary, silence_at);
                    self.set_current_section(&target);
                    self.start_clip_or_report(&entry, now);
                    return;
                }
                None => {
                    tracing::warn!(section = %target, "Queued section unavailable, dropping it");
                }
            }
        }

        // 2. successors
        let successors = self
            .catalog
            .clip(&clip)
            .map(|c| c.successors.clone())
            .unwrap_or_default();
        if !successors.is_empty() {
            let picked = self
                .picker
                .pick(&successors)
                .and_then(|i| successors.get(i))
                .cloned();
            let next = match picked {
                Some(name) if self.cache.contains(&name) => name,
                other => {
                    tracing::warn!(
                        clip = %clip,
                        successor = ?other,
                        "Successor unavailable, restarting current clip"
                    );
                    clip.clone()
                }
            };
            tracing::debug!(from = %clip, to = %next, "Hand-off");
            self.release_outgoing(instance_id, boundary, silence_at);
            self.start_clip_or_report(&next, now);
            return;
        }

        // 3. no transition
        if looping {
            if let Some(instance) = self.mixer.instance(instance_id) {
                let next = instance.next_boundary(now);
                self.timers
                    .schedule(next, TimerKind::LoopBoundary { instance: instance_id });
            }
        } else {
            let reset_at = silence_at + self.config.reset_delay_seconds;
            tracing::info!(clip = %clip, clip_end = silence_at, reset_at, "Final clip playing out");
            self.mixer.silence_at(instance_id, silence_at);
            self.timers.schedule(reset_at, TimerKind::Reset);
        }
    }

    /// Let the outgoing instance play its tail once, then silence it
    fn release_outgoing(&mut self, instance_id: InstanceId, boundary: f64, silence_at: f64) {
        self.mixer.end_loop(instance_id, boundary);
        self.mixer.silence_at(instance_id, silence_at);
    }

    fn entry_of_loaded(&self, section: &str) -> Option<String> {
        let entry = &self.catalog.section(section).ok()?.entry_clip;
        self.cache.contains(entry).then(|| entry.clone())
    }

    fn require_loaded(&self, section: &str, clip: &str) -> Result<()> {
        if self.cache.contains(clip) {
            return Ok(());
        }
        Err(CatalogError::ClipNotInTrack {
            track: self.track.clone().unwrap_or_default(),
            section: section.to_string(),
            clip: clip.to_string(),
        }
        .into())
    }

    fn start_clip_or_report(&mut self, clip: &str, now: f64) {
        if let Err(e) = self.start_clip(clip, now) {
            self.report(e);
        }
    }

    /// Make `clip` the current instance at `now` and arm its boundary
    ///
    /// A clip without successors in a non-terminal section loops natively;
    /// every other clip plays once towards its clip end.
    fn start_clip(&mut self, clip: &str, now: f64) -> Result<()> {
        let loaded = self
            .cache
            .get(clip)
            .cloned()
            .ok_or_else(|| CatalogError::ClipNotFound(clip.to_string()))?;
        let section_name = self
            .current_section
            .clone()
            .ok_or_else(|| PlaybackError::state("no current section"))?;
        let terminal = self.catalog.section(&section_name)?.is_terminal();
        let has_successors = self.catalog.clip(clip)?.has_successors();
        let looping = !has_successors && !terminal;

        let id = self.mixer.start(
            clip,
            loaded.buffer,
            loaded.timing,
            looping,
            now,
            loaded.timing.loop_start,
            self.config.hand_off_fade_seconds,
        );
        self.current_instance = Some(id);

        self.timers.cancel_loop_boundaries();
        if let Some(instance) = self.mixer.instance(id) {
            let boundary = instance.next_boundary(now);
            self.timers
                .schedule(boundary, TimerKind::LoopBoundary { instance: id });
        }

        self.set_state(EngineState::Playing);
        self.pending_events.push(EngineEvent::ClipStarted {
            clip: clip.to_string(),
            section: section_name,
        });
        tracing::debug!(clip, looping, now, "Clip started");

        self.auto_queue(clip);
        Ok(())
    }

    /// Queue an auto section's first next section from its idle loop
    fn auto_queue(&mut self, clip: &str) {
        if self.queued_section.is_some() {
            return;
        }
        let Some(section) = self
            .current_section
            .as_deref()
            .and_then(|name| self.catalog.section(name).ok())
        else {
            return;
        };
        let Some(target) = section.auto_target() else {
            return;
        };
        let idle = self
            .catalog
            .clip(clip)
            .map(|c| c.lists_itself(clip))
            .unwrap_or(false);
        if !idle {
            return;
        }

        let target = target.to_string();
        tracing::info!(section = %target, "Auto transition queued");
        self.set_queue(Some(target), true);
    }

    /// Reload the current track fresh and restore its entry section
    fn reset_track(&mut self) {
        let Some(track) = self.track.clone() else {
            self.set_state(EngineState::Idle);
            return;
        };
        self.release_resources();
        if let Err(e) = self.load_fresh(&track) {
            self.set_state(EngineState::Idle);
            self.report(e);
        }
    }

    // ===== Volume =====

    /// Set the track volume (linear 0-1, applied immediately)
    pub fn set_track_volume(&mut self, level: f32) {
        self.mixer.set_track_volume(level);
    }

    /// Track volume (linear 0-1)
    pub fn track_volume(&self) -> f32 {
        self.mixer.track_volume()
    }

    /// Set the listener volume (linear 0-1, applied immediately)
    pub fn set_listener_volume(&mut self, level: f32) {
        self.mixer.set_listener_volume(level);
    }

    /// Listener volume (linear 0-1)
    pub fn listener_volume(&self) -> f32 {
        self.mixer.listener_volume()
    }

    /// Mute or unmute this listener
    pub fn set_listener_muted(&mut self, muted: bool) {
        self.mixer.set_listener_muted(muted);
    }

    /// Listener mute state
    pub fn is_listener_muted(&self) -> bool {
        self.mixer.is_listener_muted()
    }

    /// Set the stop fade duration, clamped to 0-30 seconds
    pub fn set_fade_out_seconds(&mut self, seconds: f64) {
        self.fade_out_seconds = clamp_fade(seconds);
    }

    /// Stop fade duration in seconds
    pub fn fade_out_seconds(&self) -> f64 {
        self.fade_out_seconds
    }

    // ===== State Queries =====

    /// Current engine state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Loaded track
    pub fn track(&self) -> Option<&str> {
        self.track.as_deref()
    }

    /// Current section
    pub fn current_section(&self) -> Option<&str> {
        self.current_section.as_deref()
    }

    /// Section queued for the next loop boundary
    pub fn queued_section(&self) -> Option<&str> {
        self.queued_section.as_deref()
    }

    /// Whether the queued section was queued automatically
    pub fn is_auto_queued(&self) -> bool {
        self.auto_queued
    }

    /// Sections reachable from the current one
    ///
    /// While an automatic transition is pending every choice is locked.
    pub fn transition_choices(&self) -> Vec<TransitionChoice> {
        let Some(section) = self
            .current_section
            .as_deref()
            .and_then(|name| self.catalog.section(name).ok())
        else {
            return Vec::new();
        };

        section
            .next_sections
            .iter()
            .filter_map(|name| {
                let next = self.catalog.section(name).ok()?;
                Some(TransitionChoice {
                    name: name.clone(),
                    display_name: next.display_name_or(name).to_string(),
                    queued: self.queued_section.as_deref() == Some(name.as_str()),
                    locked: self.auto_queued,
                })
            })
            .collect()
    }

    /// What is audible now, if anything
    pub fn playback_info(&self) -> Option<PlaybackInfo> {
        let instance = self.mixer.instance(self.current_instance?)?;
        let section = self.current_section.as_deref()?;
        Some(progress::report(instance, section, self.clock.now()))
    }

    /// Current audio clock time
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Earliest pending timer deadline
    ///
    /// Offline renderers split blocks here so timers fire on time.
    pub fn next_deadline(&self) -> Option<f64> {
        self.timers.next_deadline()
    }

    /// The mixer, for inspecting live instances
    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    /// Pending timers
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// The catalog this engine plays from
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ===== Event System =====

    /// Drain all pending events
    ///
    /// Returns all events that occurred since the last drain.
    /// Call this regularly (e.g., after every tick) to keep a UI in sync.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    fn set_state(&mut self, state: EngineState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "State changed");
            self.state = state;
            self.pending_events.push(EngineEvent::StatusChanged { state });
        }
    }

    fn set_current_section(&mut self, section: &str) {
        if self.current_section.as_deref() == Some(section) {
            return;
        }
        let previous = self.current_section.replace(section.to_string());
        self.pending_events.push(EngineEvent::SectionChanged {
            section: section.to_string(),
            previous,
        });
    }

    fn set_queue(&mut self, queued: Option<String>, auto: bool) {
        if self.queued_section == queued && self.auto_queued == auto {
            return;
        }
        self.queued_section = queued.clone();
        self.auto_queued = auto;
        self.pending_events
            .push(EngineEvent::QueueChanged { queued, auto });
    }

    /// Log `err` and surface it as an event
    fn report(&mut self, err: PlaybackError) -> PlaybackError {
        match &err {
            PlaybackError::Decode { .. } => tracing::error!(error = %err, "Playback error"),
            _ => tracing::warn!(error = %err, "Playback error"),
        }
        self.pending_events.push(EngineEvent::Error {
            message: err.to_string(),
        });
        err
    }
}

fn clamp_fade(seconds: f64) -> f64 {
    if seconds.is_nan() {
        0.0
    } else {
        seconds.clamp(0.0, MAX_FADE_OUT_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::source::MemorySourceLoader;
    use loopweave_core::{AudioBuffer, AudioFormat, Clip, Section, Track};

    fn silent(seconds: f64) -> AudioBuffer {
        AudioBuffer::silent(seconds, AudioFormat::stereo(100))
    }

    fn engine() -> (Engine, ManualClock) {
        let catalog = Catalog::new()
            .with_clip("Loop", Clip::new("loop.ogg"))
            .with_section("Start", Section::new("Loop"))
            .with_track("Simple", Track::new("Start", ["Loop"]));
        let loader = MemorySourceLoader::new().with("loop.ogg", silent(4.0));
        let clock = ManualClock::new();
        let engine = Engine::new(
            Arc::new(catalog),
            Box::new(loader),
            Box::new(clock.clone()),
            EngineConfig::default(),
        );
        (engine, clock)
    }

    #[test]
    fn engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Engine>();
    }

    #[test]
    fn starts_idle() {
        let (engine, _) = engine();
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(engine.playback_info().is_none());
        assert!(engine.transition_choices().is_empty());
    }

    #[test]
    fn fade_out_is_clamped() {
        let (mut engine, _) = engine();
        engine.set_fade_out_seconds(45.0);
        assert_eq!(engine.fade_out_seconds(), 30.0);
        engine.set_fade_out_seconds(-1.0);
        assert_eq!(engine.fade_out_seconds(), 0.0);
        engine.set_fade_out_seconds(f64::NAN);
        assert_eq!(engine.fade_out_seconds(), 0.0);
    }

    #[test]
    fn steady_loop_rearms_one_boundary_per_cycle() {
        let (mut engine, clock) = engine();
        engine.load_track("Simple").unwrap();
        engine.play_section("Start").unwrap();

        for cycle in 1..=3 {
            assert_eq!(engine.timers().loop_boundary_count(), 1);
            assert_eq!(engine.next_deadline(), Some(4.0 * f64::from(cycle)));
            clock.set(4.0 * f64::from(cycle));
            engine.tick();
        }
        assert_eq!(engine.mixer().len(), 1);
        assert_eq!(engine.playback_info().unwrap().clip, "Loop");
    }

    #[test]
    fn errors_become_events() {
        let (mut engine, _) = engine();
        assert!(engine.play_section("Start").is_err());
        let events = engine.drain_events();
        assert!(events.iter().any(EngineEvent::is_error));
        assert!(!engine.has_pending_events());
    }
}
