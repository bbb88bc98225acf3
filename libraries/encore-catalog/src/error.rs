//! Error types for show catalogs.

use encore_core::{ResolutionError, ShowId};
use thiserror::Error;

/// Errors that can occur while fetching or resolving a show.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Metadata could not be turned into a playable list
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Archive returned an error response
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// No such show in this catalog
    #[error("Show not found: {0}")]
    ShowNotFound(ShowId),

    /// Failed to parse metadata
    #[error("Failed to parse metadata: {0}")]
    Parse(String),

    /// Configured base URL is unusable
    #[error("Invalid base URL: {0}")]
    InvalidBase(String),
}

impl CatalogError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn invalid_base(msg: impl Into<String>) -> Self {
        Self::InvalidBase(msg.into())
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
