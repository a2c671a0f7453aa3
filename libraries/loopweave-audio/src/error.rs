/// Audio-specific errors
use loopweave_playback::LoadError;
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Symphonia error
    #[error("Symphonia error: {0}")]
    Symphonia(String),
}

impl From<AudioError> for LoadError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::FileNotFound(path) => LoadError::NotFound { path },
            other => LoadError::Decode(other.to_string()),
        }
    }
}
