//! Filesystem clip loader

use crate::decoder::SymphoniaDecoder;
use loopweave_core::AudioBuffer;
use loopweave_playback::{LoadError, SourceLoader, SourceRequest};
use std::path::{Component, Path, PathBuf};

/// Loads clip sources from disk under a music root
///
/// A source resolves to `root/<track base path>/<file>`, or `root/<file>`
/// when the track has no base path. Base paths authored as absolute
/// (`/tracks/Forest`) are taken relative to the root.
#[derive(Debug, Clone)]
pub struct FsSourceLoader {
    root: PathBuf,
}

impl FsSourceLoader {
    /// Create a loader reading under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Music root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `request` is read from
    pub fn resolve(&self, request: &SourceRequest<'_>) -> PathBuf {
        let mut path = self.root.clone();
        if let Some(base) = request.base_path {
            path.extend(base.components().filter(|c| matches!(c, Component::Normal(_))));
        }
        path.join(request.file)
    }
}

impl SourceLoader for FsSourceLoader {
    fn load(&self, request: &SourceRequest<'_>) -> Result<AudioBuffer, LoadError> {
        let path = self.resolve(request);
        tracing::debug!(clip = request.clip, path = %path.display(), "Loading clip source");
        SymphoniaDecoder::new().decode(&path).map_err(LoadError::from)
    }
}
