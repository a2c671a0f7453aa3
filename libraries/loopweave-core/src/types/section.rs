/// Section domain type
use crate::types::one_or_many;
use serde::{Deserialize, Serialize};

/// How a section behaves at its loop boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    /// Transitions only when the listener queues one
    #[default]
    Normal,

    /// Queues its first next section automatically from an idle loop
    Auto,

    /// Plays out once and resets the track
    Terminal,
}

/// A named musical state with one designated entry clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Clip played when the section is (re-)entered
    #[serde(rename = "firstClip")]
    pub entry_clip: String,

    /// Section behaviour
    #[serde(rename = "type", default)]
    pub kind: SectionKind,

    /// Sections reachable from this one
    #[serde(
        rename = "nextSection",
        default,
        deserialize_with = "one_or_many::deserialize"
    )]
    pub next_sections: Vec<String>,

    /// Human readable name
    #[serde(
        rename = "defaultDisplayName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
}

impl Section {
    /// Create a normal section entered through `entry_clip`
    pub fn new(entry_clip: impl Into<String>) -> Self {
        Self {
            entry_clip: entry_clip.into(),
            kind: SectionKind::Normal,
            next_sections: Vec::new(),
            display_name: None,
        }
    }

    /// Set the section kind
    #[must_use]
    pub fn with_kind(mut self, kind: SectionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the reachable sections
    #[must_use]
    pub fn with_next<I, S>(mut self, next: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.next_sections = next.into_iter().map(Into::into).collect();
        self
    }

    /// Section auto-advances
    pub fn is_auto(&self) -> bool {
        self.kind == SectionKind::Auto
    }

    /// Section ends the track
    pub fn is_terminal(&self) -> bool {
        self.kind == SectionKind::Terminal
    }

    /// Target an auto section advances to, if any
    pub fn auto_target(&self) -> Option<&str> {
        if self.is_auto() {
            self.next_sections.first().map(String::as_str)
        } else {
            None
        }
    }

    /// Display name, falling back to the section key
    pub fn display_name_or<'a>(&'a self, key: &'a str) -> &'a str {
        self.display_name.as_deref().unwrap_or(key)
    }
}
