//! Loopweave CLI Library
//!
//! Catalog inspection and offline session rendering behind the `loopweave`
//! binary.
//!
//! This library exposes the core components for testing purposes.

pub mod config;
pub mod error;
pub mod inspect;
pub mod render;

// Re-export commonly used types for convenience
pub use config::LoopweaveConfig;
pub use error::{CliError, Result};
pub use inspect::describe_track;
pub use render::{render, write_wav, QueueCue, RenderPlan, Rendered};
