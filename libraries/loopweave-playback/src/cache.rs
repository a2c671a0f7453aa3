//! Buffer cache: every clip of the loaded track, decoded up front

use crate::error::{PlaybackError, Result};
use crate::source::{LoadError, SourceLoader, SourceRequest};
use loopweave_core::{AudioBuffer, Catalog, ClipTiming};
use std::collections::HashMap;
use std::sync::Arc;

/// A decoded clip with its timing resolved against the buffer
#[derive(Debug, Clone)]
pub struct LoadedClip {
    /// Decoded audio, shared with live instances
    pub buffer: Arc<AudioBuffer>,

    /// Loop region and clip end in buffer seconds
    pub timing: ClipTiming,
}

/// Decoded clips of one track keyed by clip name
#[derive(Debug, Default)]
pub struct BufferCache {
    track: Option<String>,
    clips: HashMap<String, LoadedClip>,
}

impl BufferCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every clip of `track`, replacing the current contents
    ///
    /// All or nothing: on error the cache is left empty.
    pub fn load(
        &mut self,
        catalog: &Catalog,
        track: &str,
        loader: &dyn SourceLoader,
        mode: Option<&str>,
    ) -> Result<()> {
        self.clear();

        let track_def = catalog.track(track)?;
        let mut clips = HashMap::with_capacity(track_def.clip_set.len());

        for name in &track_def.clip_set {
            if clips.contains_key(name) {
                continue;
            }
            let clip = catalog.clip(name)?;
            let file = clip
                .source
                .resolve(mode)
                .ok_or_else(|| PlaybackError::MissingSource {
                    clip: name.clone(),
                    path: format!("<no source for mode {}>", mode.unwrap_or("base")),
                })?;

            let request = SourceRequest {
                clip: name,
                file,
                base_path: track_def.base_path.as_deref(),
            };
            let buffer = loader.load(&request).map_err(|e| match e {
                LoadError::NotFound { path } => PlaybackError::MissingSource {
                    clip: name.clone(),
                    path,
                },
                LoadError::Decode(message) => PlaybackError::Decode {
                    clip: name.clone(),
                    message,
                },
            })?;

            let timing = ClipTiming::resolve(name, clip, buffer.duration_secs())?;
            tracing::debug!(
                clip = %name,
                file,
                duration = buffer.duration_secs(),
                loop_start = timing.loop_start,
                loop_point = timing.loop_point,
                clip_end = timing.clip_end,
                "Clip decoded"
            );

            clips.insert(
                name.clone(),
                LoadedClip {
                    buffer: Arc::new(buffer),
                    timing,
                },
            );
        }

        tracing::info!(track, clips = clips.len(), "Track buffers loaded");
        self.track = Some(track.to_string());
        self.clips = clips;
        Ok(())
    }

    /// Look up a decoded clip
    pub fn get(&self, clip: &str) -> Option<&LoadedClip> {
        self.clips.get(clip)
    }

    /// Whether `clip` is decoded
    pub fn contains(&self, clip: &str) -> bool {
        self.clips.contains_key(clip)
    }

    /// Track the buffers belong to
    pub fn track(&self) -> Option<&str> {
        self.track.as_deref()
    }

    /// Release every buffer
    pub fn clear(&mut self) {
        self.track = None;
        self.clips.clear();
    }

    /// Number of decoded clips
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Nothing decoded
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
