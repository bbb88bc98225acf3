//! Now-playing surface and external transport commands

use encore_core::SourceId;
use serde::{Deserialize, Serialize};

/// What lock-screen style surfaces display
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NowPlaying {
    pub source: Option<SourceId>,
    pub title: Option<String>,
    pub show_title: Option<String>,
    /// Seconds
    pub elapsed: f64,
    /// Seconds, when known and finite
    pub duration: Option<f64>,
    pub is_playing: bool,
}

impl NowPlaying {
    /// Nothing active
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Transport command from a system remote-control surface
///
/// Routed to whichever source is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RemoteCommand {
    Play,
    Pause,
    TogglePlayPause,
    /// No-op on the last track
    Next,
    /// No-op on the first track
    Previous,
    /// Absolute position in seconds
    Seek(f64),
}
