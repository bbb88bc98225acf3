/// Engine playback state
use serde::{Deserialize, Serialize};

/// State of one playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No track loaded
    #[default]
    Idle,
    /// Current track is being fetched
    Loading,
    /// Current track can start without further I/O
    Ready,
    Playing,
    Paused,
    /// Current track failed to load (retrying, or terminal once attempts run out)
    Failed,
    /// Last track of the show ended
    Completed,
}

impl PlaybackState {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Failed => "failed",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
