//! Loopweave Audio
//!
//! Decodes clip sources from disk for the Loopweave engine.
//!
//! This crate provides:
//! - Whole-file decoding via Symphonia (MP3, FLAC, OGG/Vorbis, WAV) to
//!   interleaved stereo f32
//! - [`FsSourceLoader`], a [`loopweave_playback::SourceLoader`] that resolves
//!   clip files against a music root and each track's base path
//!
//! # Example
//!
//! ```rust,no_run
//! use loopweave_audio::FsSourceLoader;
//! use loopweave_core::Catalog;
//! use loopweave_playback::{Engine, EngineConfig, SystemClock};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Arc::new(Catalog::load_dir(Path::new("assets"))?);
//! let mut engine = Engine::new(
//!     catalog,
//!     Box::new(FsSourceLoader::new("assets")),
//!     Box::new(SystemClock::new()),
//!     EngineConfig::default(),
//! );
//! engine.load_track("Forest")?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod decoder;
mod error;
mod loader;

pub use decoder::SymphoniaDecoder;
pub use error::{AudioError, Result};
pub use loader::FsSourceLoader;
