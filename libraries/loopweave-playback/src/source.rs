//! Clip source loading
//!
//! Abstracts where decoded clip audio comes from. The engine only ever asks
//! for a whole clip at track-load time; platforms plug in a decoder
//! (symphonia on disk, an asset bundle, generated audio, ...).

use loopweave_core::AudioBuffer;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// One clip source to decode
#[derive(Debug, Clone, Copy)]
pub struct SourceRequest<'a> {
    /// Clip name
    pub clip: &'a str,

    /// Source file as authored, already resolved for the source mode
    pub file: &'a str,

    /// Track directory the file is relative to
    pub base_path: Option<&'a Path>,
}

/// Why a source could not be loaded
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// Nothing exists at the source location
    #[error("Source not found: {path}")]
    NotFound { path: String },

    /// Source exists but is not decodable audio
    #[error("{0}")]
    Decode(String),
}

/// Platform-agnostic clip loader
///
/// Implementors return the fully decoded clip. Samples are f32 in
/// [-1.0, 1.0]; any channel count is accepted, stereo is preferred.
pub trait SourceLoader: Send {
    /// Decode the requested clip source
    fn load(&self, request: &SourceRequest<'_>) -> Result<AudioBuffer, LoadError>;
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Audio(Arc<AudioBuffer>),
    Corrupt(String),
}

/// Loader serving pre-decoded buffers keyed by file name
///
/// Clones share their contents, so a host can keep a handle to add or remove
/// sources after handing the loader to an engine.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceLoader {
    entries: Arc<Mutex<HashMap<String, MemoryEntry>>>,
    loads: Arc<AtomicUsize>,
}

impl MemorySourceLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source
    #[must_use]
    pub fn with(self, file: impl Into<String>, buffer: AudioBuffer) -> Self {
        self.insert(file, buffer);
        self
    }

    /// Add or replace a source
    pub fn insert(&self, file: impl Into<String>, buffer: AudioBuffer) {
        self.entries()
            .insert(file.into(), MemoryEntry::Audio(Arc::new(buffer)));
    }

    /// Register a source that fails to decode with `message`
    pub fn insert_corrupt(&self, file: impl Into<String>, message: impl Into<String>) {
        self.entries()
            .insert(file.into(), MemoryEntry::Corrupt(message.into()));
    }

    /// Remove a source
    pub fn remove(&self, file: &str) -> bool {
        self.entries().remove(file).is_some()
    }

    /// Number of successful loads served so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SourceLoader for MemorySourceLoader {
    fn load(&self, request: &SourceRequest<'_>) -> Result<AudioBuffer, LoadError> {
        let entry = self.entries().get(request.file).cloned();
        match entry {
            Some(MemoryEntry::Audio(buffer)) => {
                self.loads.fetch_add(1, Ordering::Relaxed);
                Ok(buffer.as_ref().clone())
            }
            Some(MemoryEntry::Corrupt(message)) => Err(LoadError::Decode(message)),
            None => Err(LoadError::NotFound {
                path: request.file.to_string(),
            }),
        }
    }
}
