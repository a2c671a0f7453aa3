//! Loopweave - Playback Engine
//!
//! Platform-agnostic scheduling and mixing for adaptive, seamlessly looping
//! music.
//!
//! This crate provides:
//! - Buffer cache decoding a whole track up front through a [`SourceLoader`]
//! - Mixer with per-instance gain automation, track volume and listener volume
//! - Loop-boundary scheduler ([`Engine`]) with queued, automatic and
//!   successor-driven hand-offs
//! - Stop fades with automatic reset to the track's entry section
//! - Progress reporting for display
//!
//! # Architecture
//!
//! `loopweave-playback` has no audio device or decoder dependency:
//! - Time comes from an [`AudioClock`]
//! - Decoded clips come from a [`SourceLoader`]
//! - The host pulls samples with [`Engine::render`] and drives timers with
//!   [`Engine::tick`]
//!
//! # Example: Offline Session
//!
//! ```rust
//! use loopweave_core::{AudioBuffer, AudioFormat, Catalog, Clip, Section, Track};
//! use loopweave_playback::{
//!     AudioClock, Engine, EngineConfig, EngineState, ManualClock, MemorySourceLoader,
//! };
//! use std::sync::Arc;
//!
//! let catalog = Catalog::new()
//!     .with_clip("Loop", Clip::new("loop.ogg"))
//!     .with_section("Start", Section::new("Loop"))
//!     .with_track("Forest", Track::new("Start", ["Loop"]));
//!
//! let loader = MemorySourceLoader::new()
//!     .with("loop.ogg", AudioBuffer::silent(4.0, AudioFormat::stereo(44_100)));
//! let clock = ManualClock::new();
//!
//! let mut engine = Engine::new(
//!     Arc::new(catalog),
//!     Box::new(loader),
//!     Box::new(clock.clone()),
//!     EngineConfig::default(),
//! );
//!
//! engine.load_track("Forest").unwrap();
//! engine.play_section("Start").unwrap();
//! assert_eq!(engine.state(), EngineState::Playing);
//!
//! // Render one block, then let timers catch up
//! let mut block = vec![0.0f32; 1024];
//! engine.render(clock.now(), 44_100, &mut block);
//! clock.advance_frames(512, 44_100);
//! engine.tick();
//!
//! for event in engine.drain_events() {
//!     println!("{event:?}");
//! }
//! ```

mod automation;
mod cache;
mod clock;
mod engine;
mod error;
mod events;
mod mixer;
mod picker;
mod progress;
mod source;
mod timers;
pub mod types;
mod volume;

// Public exports
pub use automation::GainParam;
pub use cache::{BufferCache, LoadedClip};
pub use clock::{AudioClock, ManualClock, SystemClock};
pub use engine::Engine;
pub use error::{PlaybackError, Result};
pub use events::EngineEvent;
pub use mixer::{InstanceId, Mixer, PlaybackInstance, BOUNDARY_EPSILON};
pub use picker::{RandomPicker, ScriptedPicker, SuccessorPicker};
pub use source::{LoadError, MemorySourceLoader, SourceLoader, SourceRequest};
pub use timers::{DueTimer, TimerId, TimerKind, TimerQueue};
pub use types::{EngineConfig, EngineState, PlaybackInfo, TransitionChoice};
pub use volume::Volume;
