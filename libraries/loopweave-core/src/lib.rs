//! Loopweave Core
//!
//! Catalog data model for adaptive, seamlessly looping music.
//!
//! Music is authored as a graph: a **track** is entered through one
//! **section**, each section starts at one entry **clip**, and clips name
//! the clips that may follow them at their loop point. This crate parses
//! and validates that graph; decoding and scheduling live elsewhere.
//!
//! # Example
//!
//! ```rust
//! use loopweave_core::{Catalog, Clip, Section, Track};
//!
//! let catalog = Catalog::new()
//!     .with_clip("Intro", Clip::new("intro.ogg").with_loop(0.0, 8.0))
//!     .with_section("Start", Section::new("Intro"))
//!     .with_track("Forest", Track::new("Start", ["Intro"]));
//!
//! assert!(catalog.validate_track("Forest").is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod types;

pub use catalog::Catalog;
pub use error::{CatalogError, Result};
pub use types::{
    AudioBuffer, AudioFormat, Clip, ClipSource, ClipTiming, SampleRate, Section, SectionKind,
    Track, BASE_SOURCE_MODE,
};
