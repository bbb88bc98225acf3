//! Embedded video source
//!
//! The video player is opaque: play, pause, stop, and two status queries.

use crate::coordinator::Pausable;
use encore_core::SourceId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Embedded video player
pub trait VideoPlayer: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn has_content(&self) -> bool;
}

/// Video transport commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCommand {
    Play,
    Pause,
    Stop,
    /// Video started from its own controls
    Started,
}

/// Slot holding the video player, if the platform provides one
#[derive(Default)]
pub struct VideoSlot {
    player: Option<Box<dyn VideoPlayer>>,
}

impl VideoSlot {
    pub fn new(player: Box<dyn VideoPlayer>) -> Self {
        Self {
            player: Some(player),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_present(&self) -> bool {
        self.player.is_some()
    }

    pub fn play(&mut self) {
        if let Some(player) = self.player.as_mut() {
            debug!("Video play");
            player.play();
        }
    }

    pub fn stop(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.stop();
        }
    }
}

impl Pausable for VideoSlot {
    fn source(&self) -> SourceId {
        SourceId::Youtube
    }

    fn pause(&mut self) {
        if let Some(player) = self.player.as_mut() {
            if player.is_playing() {
                debug!("Video pause");
                player.pause();
            }
        }
    }

    fn is_playing(&self) -> bool {
        self.player.as_ref().is_some_and(|p| p.is_playing())
    }

    fn has_loaded_track(&self) -> bool {
        self.player.as_ref().is_some_and(|p| p.has_content())
    }
}
