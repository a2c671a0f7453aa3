//! Catalog of clips, sections and tracks
//!
//! The catalog is immutable once loaded: the scheduler only reads it.
//! Authoring data comes as three JSON files (`clipData.json`,
//! `sectionData.json`, `trackData.json`); each may wrap its table in a
//! top-level key (`{"clips": {...}}`) or be the bare map.

use crate::error::{CatalogError, Result};
use crate::types::{Clip, Section, Track};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

/// Clip table file name
pub const CLIP_DATA_FILE: &str = "clipData.json";
/// Section table file name
pub const SECTION_DATA_FILE: &str = "sectionData.json";
/// Track table file name
pub const TRACK_DATA_FILE: &str = "trackData.json";

/// Name-keyed lookup of every clip, section and track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Clips by name
    #[serde(default)]
    pub clips: BTreeMap<String, Clip>,

    /// Sections by name
    #[serde(default)]
    pub sections: BTreeMap<String, Section>,

    /// Tracks by name
    #[serde(default)]
    pub tracks: BTreeMap<String, Track>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the three authoring tables
    pub fn from_tables(clips_json: &str, sections_json: &str, tracks_json: &str) -> Result<Self> {
        Ok(Self {
            clips: parse_table(clips_json, "clips")?,
            sections: parse_table(sections_json, "sections")?,
            tracks: parse_table(tracks_json, "tracks")?,
        })
    }

    /// Load a catalog directory
    ///
    /// Reads the three tables at the root (a missing file is an empty table),
    /// then merges `clipData.json`/`sectionData.json` found in each track's
    /// own directory (`basePath` under the root, or `tracks/<name>`).
    pub fn load_dir(root: &Path) -> Result<Self> {
        let mut catalog = Self {
            clips: read_table(&root.join(CLIP_DATA_FILE), "clips")?,
            sections: read_table(&root.join(SECTION_DATA_FILE), "sections")?,
            tracks: read_table(&root.join(TRACK_DATA_FILE), "tracks")?,
        };

        let track_dirs: Vec<(String, PathBuf)> = catalog
            .tracks
            .iter()
            .map(|(name, track)| (name.clone(), track_dir(root, name, track)))
            .collect();

        for (name, dir) in track_dirs {
            if dir.is_dir() {
                catalog.merge_track_dir(&name, &dir)?;
            }
        }

        tracing::info!(
            clips = catalog.clips.len(),
            sections = catalog.sections.len(),
            tracks = catalog.tracks.len(),
            root = %root.display(),
            "Catalog loaded"
        );

        Ok(catalog)
    }

    fn merge_track_dir(&mut self, track: &str, dir: &Path) -> Result<()> {
        let clips: BTreeMap<String, Clip> = read_table(&dir.join(CLIP_DATA_FILE), "clips")?;
        let sections: BTreeMap<String, Section> =
            read_table(&dir.join(SECTION_DATA_FILE), "sections")?;

        for (name, clip) in clips {
            if self.clips.contains_key(&name) {
                tracing::warn!(track, clip = %name, "Duplicate clip name, keeping first definition");
                continue;
            }
            self.clips.insert(name, clip);
        }
        for (name, section) in sections {
            if self.sections.contains_key(&name) {
                tracing::warn!(track, section = %name, "Duplicate section name, keeping first definition");
                continue;
            }
            self.sections.insert(name, section);
        }
        Ok(())
    }

    /// Add a clip
    #[must_use]
    pub fn with_clip(mut self, name: impl Into<String>, clip: Clip) -> Self {
        self.clips.insert(name.into(), clip);
        self
    }

    /// Add a section
    #[must_use]
    pub fn with_section(mut self, name: impl Into<String>, section: Section) -> Self {
        self.sections.insert(name.into(), section);
        self
    }

    /// Add a track
    #[must_use]
    pub fn with_track(mut self, name: impl Into<String>, track: Track) -> Self {
        self.tracks.insert(name.into(), track);
        self
    }

    /// Look up a clip
    pub fn clip(&self, name: &str) -> Result<&Clip> {
        self.clips
            .get(name)
            .ok_or_else(|| CatalogError::ClipNotFound(name.to_string()))
    }

    /// Look up a section
    pub fn section(&self, name: &str) -> Result<&Section> {
        self.sections
            .get(name)
            .ok_or_else(|| CatalogError::SectionNotFound(name.to_string()))
    }

    /// Look up a track
    pub fn track(&self, name: &str) -> Result<&Track> {
        self.tracks
            .get(name)
            .ok_or_else(|| CatalogError::TrackNotFound(name.to_string()))
    }

    /// Sections reachable from the track's entry section, entry first
    ///
    /// Missing sections are skipped; `validate_track` reports them.
    pub fn reachable_sections(&self, track: &Track) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([track.entry_section.clone()]);

        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(section) = self.sections.get(&name) else {
                continue;
            };
            order.push(name);
            queue.extend(section.next_sections.iter().cloned());
        }

        order
    }

    /// Check that everything the track references exists
    ///
    /// Fails on a missing track, a missing clip of the clip set, a missing
    /// section reachable from the entry section, or a reachable section whose
    /// entry clip is not decoded with the track. Missing successor clips are
    /// only warned about; playback degrades to looping.
    pub fn validate_track(&self, name: &str) -> Result<&Track> {
        let track = self.track(name)?;

        for clip in &track.clip_set {
            self.clip(clip)?;
        }

        let mut queue = VecDeque::from([track.entry_section.clone()]);
        let mut seen = BTreeSet::new();
        while let Some(section_name) = queue.pop_front() {
            if !seen.insert(section_name.clone()) {
                continue;
            }
            let section = self.section(&section_name)?;
            if !track.contains_clip(&section.entry_clip) {
                self.clip(&section.entry_clip)?;
                return Err(CatalogError::ClipNotInTrack {
                    track: name.to_string(),
                    section: section_name,
                    clip: section.entry_clip.clone(),
                });
            }
            queue.extend(section.next_sections.iter().cloned());
        }

        for clip_name in &track.clip_set {
            let clip = self.clip(clip_name)?;
            for successor in &clip.successors {
                if !track.contains_clip(successor) {
                    tracing::warn!(
                        track = name,
                        clip = %clip_name,
                        successor = %successor,
                        "Successor is not part of the track and will be skipped"
                    );
                }
            }
        }

        Ok(track)
    }
}

fn track_dir(root: &Path, name: &str, track: &Track) -> PathBuf {
    match &track.base_path {
        Some(base) => root.join(base.strip_prefix("/").unwrap_or(base.as_path())),
        None => root.join("tracks").join(name),
    }
}

fn read_table<T: DeserializeOwned>(path: &Path, key: &str) -> Result<BTreeMap<String, T>> {
    match std::fs::read_to_string(path) {
        Ok(json) => parse_table(&json, key),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Catalog table missing, using empty table");
            Ok(BTreeMap::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_table<T: DeserializeOwned>(json: &str, key: &str) -> Result<BTreeMap<String, T>> {
    let mut value: serde_json::Value = serde_json::from_str(json)?;
    let table = match value.get_mut(key) {
        Some(inner) if inner.is_object() => inner.take(),
        _ => value,
    };
    Ok(serde_json::from_value(table)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SectionKind;

    fn forest() -> Catalog {
        Catalog::new()
            .with_clip("Intro", Clip::new("intro.ogg").with_successors(["Loop"]))
            .with_clip("Loop", Clip::new("loop.ogg"))
            .with_clip("End_a", Clip::new("end.ogg"))
            .with_section("Start", Section::new("Intro").with_next(["Finale"]))
            .with_section(
                "Finale",
                Section::new("End_a").with_kind(SectionKind::Terminal),
            )
            .with_track("Forest", Track::new("Start", ["Intro", "Loop", "End_a"]))
    }

    #[test]
    fn wrapped_and_bare_tables_parse_alike() {
        let wrapped = Catalog::from_tables(
            r#"{ "clips": { "a": { "file": "a.ogg" } } }"#,
            r#"{ "sections": { "s": { "firstClip": "a" } } }"#,
            r#"{ "tracks": { "t": { "allClips": ["a"], "firstSection": "s" } } }"#,
        )
        .unwrap();
        let bare = Catalog::from_tables(
            r#"{ "a": { "file": "a.ogg" } }"#,
            r#"{ "s": { "firstClip": "a" } }"#,
            r#"{ "t": { "allClips": ["a"], "firstSection": "s" } }"#,
        )
        .unwrap();

        assert_eq!(wrapped, bare);
        assert!(wrapped.validate_track("t").is_ok());
    }

    #[test]
    fn validate_accepts_complete_track() {
        let catalog = forest();
        let track = catalog.validate_track("Forest").unwrap();
        assert_eq!(track.entry_section, "Start");
        assert_eq!(
            catalog.reachable_sections(track),
            vec!["Start".to_string(), "Finale".to_string()]
        );
    }

    #[test]
    fn validate_reports_missing_track() {
        let err = forest().validate_track("Desert").unwrap_err();
        assert!(matches!(err, CatalogError::TrackNotFound(name) if name == "Desert"));
    }

    #[test]
    fn validate_reports_missing_clip_in_clip_set() {
        let catalog = forest().with_track("Broken", Track::new("Start", ["Intro", "Ghost"]));
        let err = catalog.validate_track("Broken").unwrap_err();
        assert!(matches!(err, CatalogError::ClipNotFound(name) if name == "Ghost"));
    }

    #[test]
    fn validate_reports_missing_reachable_section() {
        let catalog = forest().with_section("Start", Section::new("Intro").with_next(["Nowhere"]));
        let err = catalog.validate_track("Forest").unwrap_err();
        assert!(matches!(err, CatalogError::SectionNotFound(ref name) if name == "Nowhere"));
        assert!(err.is_missing_reference());
    }

    #[test]
    fn validate_reports_entry_clip_outside_track() {
        let catalog = forest().with_track("Short", Track::new("Start", ["Loop"]));
        let err = catalog.validate_track("Short").unwrap_err();
        assert!(matches!(err, CatalogError::ClipNotInTrack { ref clip, .. } if clip == "Intro"));
    }

    #[test]
    fn missing_successor_is_not_fatal() {
        let catalog =
            forest().with_clip("Loop", Clip::new("loop.ogg").with_successors(["Vanished"]));
        assert!(catalog.validate_track("Forest").is_ok());
    }

    #[test]
    fn load_dir_merges_track_directories() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join(TRACK_DATA_FILE),
            r#"{ "tracks": { "Forest": { "allClips": ["Intro"], "firstSection": "Start", "basePath": "/tracks/Forest" } } }"#,
        )
        .unwrap();
        let track_dir = root.path().join("tracks").join("Forest");
        std::fs::create_dir_all(&track_dir).unwrap();
        std::fs::write(
            track_dir.join(CLIP_DATA_FILE),
            r#"{ "clips": { "Intro": { "file": "intro.ogg" } } }"#,
        )
        .unwrap();
        std::fs::write(
            track_dir.join(SECTION_DATA_FILE),
            r#"{ "sections": { "Start": { "firstClip": "Intro" } } }"#,
        )
        .unwrap();

        let catalog = Catalog::load_dir(root.path()).unwrap();
        assert!(catalog.clip("Intro").is_ok());
        assert!(catalog.validate_track("Forest").is_ok());
    }

    #[test]
    fn load_dir_rejects_malformed_json() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join(CLIP_DATA_FILE), "{ not json").unwrap();
        let err = Catalog::load_dir(root.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));
    }

    #[test]
    fn load_dir_of_empty_directory_is_empty_catalog() {
        let root = tempfile::tempdir().unwrap();
        let catalog = Catalog::load_dir(root.path()).unwrap();
        assert_eq!(catalog, Catalog::new());
    }
}
