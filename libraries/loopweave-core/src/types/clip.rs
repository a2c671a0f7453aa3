/// Clip domain type
use crate::error::{CatalogError, Result};
use crate::types::one_or_many;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the source mode used when no mode is requested
pub const BASE_SOURCE_MODE: &str = "base";

/// Tolerance for comparing authored timing against decoded durations
const TIMING_EPSILON: f64 = 1e-6;

/// Where a clip's audio comes from
///
/// Authoring data either names a single file or maps source modes
/// (`base`, `lofi`, ...) to files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClipSource {
    /// A single file
    File(String),

    /// Files keyed by source mode
    Modes(BTreeMap<String, String>),
}

impl ClipSource {
    /// Resolve the file for `mode`, falling back to the base mode
    pub fn resolve(&self, mode: Option<&str>) -> Option<&str> {
        match self {
            ClipSource::File(file) => Some(file.as_str()),
            ClipSource::Modes(modes) => mode
                .and_then(|m| modes.get(m))
                .or_else(|| modes.get(BASE_SOURCE_MODE))
                .map(String::as_str),
        }
    }
}

impl From<&str> for ClipSource {
    fn from(file: &str) -> Self {
        ClipSource::File(file.to_string())
    }
}

/// A named reference to one audio file plus loop/hand-off metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    /// Audio file (or files by source mode)
    #[serde(rename = "file")]
    pub source: ClipSource,

    /// Offset where playback begins and where a self-loop returns to (seconds)
    #[serde(default)]
    pub loop_start: f64,

    /// Offset of the next-clip decision (seconds, defaults to buffer duration)
    #[serde(default)]
    pub loop_point: Option<f64>,

    /// End of audible content (seconds, defaults to buffer duration)
    #[serde(default)]
    pub clip_end: Option<f64>,

    /// Clips that may follow this one; empty means a steady loop
    #[serde(
        rename = "nextClip",
        default,
        deserialize_with = "one_or_many::deserialize"
    )]
    pub successors: Vec<String>,
}

impl Clip {
    /// Create a clip playing `source` from the start with no successors
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: ClipSource::File(source.into()),
            loop_start: 0.0,
            loop_point: None,
            clip_end: None,
            successors: Vec::new(),
        }
    }

    /// Set the loop region
    #[must_use]
    pub fn with_loop(mut self, loop_start: f64, loop_point: f64) -> Self {
        self.loop_start = loop_start;
        self.loop_point = Some(loop_point);
        self
    }

    /// Set the end of audible content
    #[must_use]
    pub fn with_clip_end(mut self, clip_end: f64) -> Self {
        self.clip_end = Some(clip_end);
        self
    }

    /// Set the successor list
    #[must_use]
    pub fn with_successors<I, S>(mut self, successors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.successors = successors.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this clip hands off to other clips at its loop point
    pub fn has_successors(&self) -> bool {
        !self.successors.is_empty()
    }

    /// Whether the clip names itself as a successor ("idle loop, leave whenever")
    pub fn lists_itself(&self, own_name: &str) -> bool {
        self.successors.iter().any(|s| s == own_name)
    }
}

/// Clip timing resolved against a decoded buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipTiming {
    /// Loop start (seconds into the buffer)
    pub loop_start: f64,
    /// Loop point (seconds into the buffer)
    pub loop_point: f64,
    /// End of audible content (seconds into the buffer)
    pub clip_end: f64,
}

impl ClipTiming {
    /// Resolve defaults and check `0 <= loop_start < loop_point <= clip_end`
    pub fn resolve(name: &str, clip: &Clip, buffer_duration: f64) -> Result<Self> {
        let loop_start = clip.loop_start;
        let loop_point = clip.loop_point.unwrap_or(buffer_duration);
        let clip_end = clip.clip_end.unwrap_or(buffer_duration);

        for (label, value) in [
            ("loopStart", loop_start),
            ("loopPoint", loop_point),
            ("clipEnd", clip_end),
        ] {
            if !value.is_finite() {
                return Err(CatalogError::invalid_timing(
                    name,
                    format!("{label} is not a finite number"),
                ));
            }
        }

        if loop_start < 0.0 {
            return Err(CatalogError::invalid_timing(
                name,
                format!("loopStart {loop_start} is negative"),
            ));
        }
        if loop_point - loop_start <= TIMING_EPSILON {
            return Err(CatalogError::invalid_timing(
                name,
                format!("loopPoint {loop_point} must be after loopStart {loop_start}"),
            ));
        }
        if loop_point > clip_end + TIMING_EPSILON {
            return Err(CatalogError::invalid_timing(
                name,
                format!("loopPoint {loop_point} is past clipEnd {clip_end}"),
            ));
        }

        if clip_end > buffer_duration + 0.05 {
            tracing::warn!(
                clip = name,
                clip_end,
                buffer_duration,
                "clipEnd lies past the decoded audio; the tail will be silent"
            );
        }

        Ok(Self {
            loop_start,
            loop_point,
            clip_end,
        })
    }

    /// Length of one loop cycle
    pub fn cycle(&self) -> f64 {
        self.loop_point - self.loop_start
    }

    /// Audible tail after the loop point
    pub fn tail(&self) -> f64 {
        (self.clip_end - self.loop_point).max(0.0)
    }
}
