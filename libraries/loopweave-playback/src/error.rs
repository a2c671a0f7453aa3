//! Error types for the playback engine

use loopweave_core::CatalogError;
use thiserror::Error;

/// Playback errors
///
/// `Data` and `MissingSource` are data errors, `Decode` is a decode error and
/// `State` rejects an operation in the current engine state. None of them
/// are retried by the engine.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Catalog data is missing or inconsistent
    #[error(transparent)]
    Data(#[from] CatalogError),

    /// A clip's source file does not exist
    #[error("Source for clip '{clip}' not found: {path}")]
    MissingSource { clip: String, path: String },

    /// A clip's source could not be decoded
    #[error("Failed to decode clip '{clip}': {message}")]
    Decode { clip: String, message: String },

    /// Operation is not valid in the current state
    #[error("Invalid state: {0}")]
    State(String),

    /// A named section or track does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },
}

impl PlaybackError {
    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Create a section not found error
    pub fn section_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Section",
            name: name.into(),
        }
    }

    /// Whether this is a data error (missing or inconsistent authoring data)
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::Data(_) | Self::MissingSource { .. } | Self::NotFound { .. }
        )
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
