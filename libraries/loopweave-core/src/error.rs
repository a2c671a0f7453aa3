/// Catalog error types for Loopweave
use thiserror::Error;

/// Result type alias using `CatalogError`
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors raised while loading or validating catalog data
///
/// Every variant is a data error: something the authoring JSON references
/// is absent or inconsistent. None of them are retried.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Track not present in the catalog
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// Section not present in the catalog
    #[error("Section not found: {0}")]
    SectionNotFound(String),

    /// Clip not present in the catalog
    #[error("Clip not found: {0}")]
    ClipNotFound(String),

    /// A section's entry clip is not part of the track's clip set
    #[error("Clip '{clip}' is the entry of section '{section}' but is not loaded by track '{track}'")]
    ClipNotInTrack {
        track: String,
        section: String,
        clip: String,
    },

    /// Clip timing violates `0 <= loopStart < loopPoint <= clipEnd`
    #[error("Invalid timing for clip '{clip}': {reason}")]
    InvalidClipTiming { clip: String, reason: String },

    /// I/O errors while reading catalog files
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed catalog JSON
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    /// Create an invalid timing error
    pub fn invalid_timing(clip: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidClipTiming {
            clip: clip.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means a referenced entity is missing
    pub fn is_missing_reference(&self) -> bool {
        matches!(
            self,
            Self::TrackNotFound(_)
                | Self::SectionNotFound(_)
                | Self::ClipNotFound(_)
                | Self::ClipNotInTrack { .. }
        )
    }
}
