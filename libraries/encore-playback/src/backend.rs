//! Platform media stack abstraction
//!
//! Decoding and HTTP live in the platform. The engine only decides *when*
//! and *what* to fetch, through two traits:
//! - [`MediaBackend`] constructs player items, synchronously for the
//!   current track and asynchronously (pre-rolled) for look-ahead
//! - [`MediaPlayer`] drives one underlying player and reports item
//!   lifecycle through typed [`PlayerEvent`]s sent on a channel

use async_trait::async_trait;
use encore_core::{ByteRange, LoadError, SessionError, SourceId};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;
use url::Url;

/// Identity of one constructed player item
///
/// Every load gets a fresh id, so events for an item that has since been
/// replaced can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// Everything the platform needs to build a player item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRequest {
    pub track_index: usize,
    pub url: Url,
    pub range: ByteRange,
    /// Forward buffer the player should aim for
    pub preferred_buffer: Duration,
}

/// Constructs player items
#[async_trait]
pub trait MediaBackend: Send + Sync + 'static {
    /// Opaque platform item handle
    type Item: Send + 'static;

    /// Build an item without waiting for any I/O
    fn create_item(&self, request: &ItemRequest) -> Self::Item;

    /// Build and pre-roll an item for look-ahead
    async fn prepare_item(&self, request: ItemRequest) -> Result<Self::Item, LoadError>;
}

/// One underlying media player
pub trait MediaPlayer: Send + 'static {
    type Item: Send + 'static;

    /// Swap in a new current item; readiness arrives as a [`PlayerEvent`]
    ///
    /// The player stays silent until the next `play`.
    fn replace_current(&mut self, id: ItemId, item: Self::Item);

    /// Drop the current item
    fn clear(&mut self);

    fn play(&mut self);

    fn pause(&mut self);

    /// 0.0-1.0
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    /// Seconds from the start of the current item
    fn seek(&mut self, position: f64);

    /// `None` until known; may be infinite for live or partial metadata
    fn duration(&self) -> Option<f64>;

    fn elapsed(&self) -> f64;

    /// Activate the platform audio session before audible playback
    fn activate_session(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Item lifecycle reported by a [`MediaPlayer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    ItemReady { item: ItemId },
    ItemFailed { item: ItemId, reason: String },
    ItemEnded { item: ItemId },
}

impl PlayerEvent {
    pub fn item(&self) -> ItemId {
        match self {
            Self::ItemReady { item } | Self::ItemFailed { item, .. } | Self::ItemEnded { item } => {
                *item
            }
        }
    }
}

/// Channel a player uses to report [`PlayerEvent`]s, tagged with its source
#[derive(Debug, Clone)]
pub struct PlayerEventSender {
    source: SourceId,
    tx: mpsc::UnboundedSender<(SourceId, PlayerEvent)>,
}

impl PlayerEventSender {
    pub fn new(source: SourceId, tx: mpsc::UnboundedSender<(SourceId, PlayerEvent)>) -> Self {
        Self { source, tx }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn send(&self, event: PlayerEvent) {
        if self.tx.send((self.source, event)).is_err() {
            trace!(source = %self.source, "Player event dropped, hub is gone");
        }
    }
}
