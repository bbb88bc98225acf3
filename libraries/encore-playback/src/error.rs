//! Error types for playback management

use encore_core::{LoadError, ResolutionError, SeekError, SourceId};
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No show is loaded on this engine
    #[error("No show loaded")]
    NoShowLoaded,

    /// Track index outside the loaded show
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Command addressed to a source this hub does not drive
    #[error("Unknown source: {0}")]
    UnknownSource(SourceId),

    #[error(transparent)]
    Seek(#[from] SeekError),

    /// Configuration value out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The hub control loop has stopped
    #[error("Playback hub closed")]
    HubClosed,
}

impl PlaybackError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Why the current track could not be played
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackFailure {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The entry never resolved to a locator
    #[error(transparent)]
    Unresolved(#[from] ResolutionError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
