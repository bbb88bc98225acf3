/// ID types for Encore entities
use serde::{Deserialize, Serialize};
use std::fmt;

/// Show identifier (archive item identifier or bundled listing key)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowId(String);

impl ShowId {
    /// Create a new show ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ShowId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Content source that may produce audio
///
/// `Dead` and `Jerry` are the two concert catalogs, each driven by its own
/// playback engine. `Youtube` is the embedded video player, which only
/// supports play/pause/stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Dead,
    Jerry,
    Youtube,
}

impl SourceId {
    /// Sources backed by a playback engine
    pub const CATALOGS: [SourceId; 2] = [SourceId::Dead, SourceId::Jerry];

    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dead => "dead",
            Self::Jerry => "jerry",
            Self::Youtube => "youtube",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dead" => Some(Self::Dead),
            "jerry" => Some(Self::Jerry),
            "youtube" => Some(Self::Youtube),
            _ => None,
        }
    }

    /// Whether this source is one of the audio catalogs
    pub fn is_catalog(&self) -> bool {
        !matches!(self, Self::Youtube)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
