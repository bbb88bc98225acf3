/// Core error types for Encore
use crate::types::ShowId;
use thiserror::Error;

/// Result type alias using `EncoreError`
pub type Result<T> = std::result::Result<T, EncoreError>;

/// Failure to turn catalog metadata into a fetchable locator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The locator for one track could not be constructed or did not validate
    #[error("Invalid resource for track {index}: {reason}")]
    InvalidResource { index: usize, reason: String },

    /// The show has no entries that pass format selection
    #[error("Show {0} has no playable tracks")]
    NoPlayableTracks(ShowId),
}

impl ResolutionError {
    /// Create an invalid resource error
    pub fn invalid_resource(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidResource {
            index,
            reason: reason.into(),
        }
    }
}

/// Failure to load a track into the media player
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Network or decode failure, worth retrying
    #[error("Transient load failure: {0}")]
    Transient(String),

    /// Every allowed attempt for this track failed
    #[error("Track {index} failed after {attempts} attempts")]
    Exhausted { index: usize, attempts: u32 },
}

impl LoadError {
    /// Create a transient load error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Whether the engine may retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Seek request that cannot be honoured
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekError {
    /// Duration is unknown, infinite or NaN
    #[error("Cannot seek: duration is not finite")]
    NonFinite,
}

/// Platform audio session could not be activated
///
/// Logged and otherwise ignored: audio may still route correctly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Audio session error: {0}")]
pub struct SessionError(pub String);

impl SessionError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Umbrella error for Encore
#[derive(Error, Debug)]
pub enum EncoreError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Seek(#[from] SeekError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Persisted blob could not be encoded or decoded
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EncoreError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(LoadError::transient("timed out").is_retryable());
        assert!(!LoadError::Exhausted {
            index: 2,
            attempts: 3
        }
        .is_retryable());
    }

    #[test]
    fn resolution_error_message_names_index() {
        let err = ResolutionError::invalid_resource(2, "empty filename");
        assert_eq!(err.to_string(), "Invalid resource for track 2: empty filename");
    }

    #[test]
    fn umbrella_wraps_kinds_transparently() {
        let err: EncoreError = SeekError::NonFinite.into();
        assert_eq!(err.to_string(), "Cannot seek: duration is not finite");
    }
}
