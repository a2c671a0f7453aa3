/// Track domain type
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The unit a caller loads and unloads as a whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Every clip decoded together at load time
    #[serde(rename = "allClips", default)]
    pub clip_set: Vec<String>,

    /// Section used on (re-)load and reset
    #[serde(rename = "firstSection")]
    pub entry_section: String,

    /// Directory source files are resolved against
    #[serde(rename = "basePath", default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<PathBuf>,

    /// Human readable name
    #[serde(
        rename = "defaultDisplayName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,

    /// Single-section track with no transitions to offer
    #[serde(default = "default_simple")]
    pub simple: bool,
}

fn default_simple() -> bool {
    true
}

impl Track {
    /// Create a track entered through `entry_section`
    pub fn new<I, S>(entry_section: impl Into<String>, clip_set: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clip_set: clip_set.into_iter().map(Into::into).collect(),
            entry_section: entry_section.into(),
            base_path: None,
            display_name: None,
            simple: true,
        }
    }

    /// Set the base path
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Whether `clip` is decoded with this track
    pub fn contains_clip(&self, clip: &str) -> bool {
        self.clip_set.iter().any(|c| c == clip)
    }

    /// Display name, falling back to the track key
    pub fn display_name_or<'a>(&'a self, key: &'a str) -> &'a str {
        self.display_name.as_deref().unwrap_or(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authoring_json() {
        let track: Track = serde_json::from_str(
            r#"{ "allClips": ["Intro", "Loop"], "firstSection": "Start", "basePath": "/tracks/Forest", "simple": false }"#,
        )
        .unwrap();

        assert_eq!(track.clip_set.len(), 2);
        assert!(track.contains_clip("Loop"));
        assert!(!track.contains_clip("Battle"));
        assert_eq!(track.base_path, Some(PathBuf::from("/tracks/Forest")));
        assert!(!track.simple);
        assert_eq!(track.display_name_or("Forest"), "Forest");
    }

    #[test]
    fn simple_defaults_to_true() {
        let track: Track =
            serde_json::from_str(r#"{ "allClips": ["a"], "firstSection": "s" }"#).unwrap();
        assert!(track.simple);
        assert!(track.base_path.is_none());
    }
}
