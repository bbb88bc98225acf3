//! Completion messages from background tasks back to the control loop
//!
//! Fade steps, retry timers and preloads run as spawned tasks. They never
//! touch engine state; they post an [`EngineMessage`] that the control loop
//! hands to the owning engine.

use crate::backend::ItemId;
use encore_core::{ByteRange, LoadError, SourceId};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;

/// Background completion for one engine
#[derive(Debug)]
pub enum EngineMessage<I> {
    /// Step `step` of fade `fade_id` is due
    FadeStep { fade_id: u64, step: u32 },

    /// Backoff for retry `ticket` elapsed
    RetryDue { ticket: u64 },

    /// A look-ahead item finished preparing
    Preloaded(Preloaded<I>),
}

/// Result of one look-ahead preparation
#[derive(Debug)]
pub struct Preloaded<I> {
    /// Buffer generation the request belonged to
    pub epoch: u64,
    pub track_index: usize,
    pub item_id: ItemId,
    pub range: ByteRange,
    pub preferred_buffer: Duration,
    pub result: Result<I, LoadError>,
}

pub type Envelope<I> = (SourceId, EngineMessage<I>);

/// Sending half handed to an engine and its buffer
#[derive(Debug)]
pub struct Mailbox<I> {
    source: SourceId,
    tx: mpsc::UnboundedSender<Envelope<I>>,
}

impl<I> Clone for Mailbox<I> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            tx: self.tx.clone(),
        }
    }
}

impl<I> Mailbox<I> {
    pub fn new(source: SourceId, tx: mpsc::UnboundedSender<Envelope<I>>) -> Self {
        Self { source, tx }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn post(&self, message: EngineMessage<I>) {
        if self.tx.send((self.source, message)).is_err() {
            trace!(source = %self.source, "Engine message dropped, control loop is gone");
        }
    }
}
