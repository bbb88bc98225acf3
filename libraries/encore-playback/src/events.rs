//! Playback Events
//!
//! Engines never call out to the coordinator or the history sink. They
//! push [`EngineEvent`]s into an outbox that the control loop drains after
//! every dispatch, and the control loop republishes the user-facing ones
//! as [`HubEvent`]s on a broadcast channel.

use crate::error::TrackFailure;
use encore_core::{NetworkState, PlaybackState, ShowId, SourceId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// History trigger raised by an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryMark {
    AddToHistory(ShowId),
    Partial(ShowId),
    Completed(ShowId),
}

/// Outbox entry of one engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StateChanged {
        state: PlaybackState,
    },

    /// A new current track was selected
    TrackChanged {
        index: usize,
        title: String,
    },

    TrackReady {
        index: usize,
    },

    /// Load failed; `terminal` once retries are exhausted or the entry never resolved
    TrackFailed {
        index: usize,
        error: TrackFailure,
        terminal: bool,
    },

    RetryScheduled {
        index: usize,
        attempt: u32,
        delay: Duration,
    },

    TrackEnded {
        index: usize,
    },

    /// Periodic position sample
    Progress {
        index: usize,
        elapsed: f64,
        duration: Option<f64>,
    },

    /// The engine wants to become audible; the coordinator decides when
    StartRequested,

    History(HistoryMark),

    ShowCompleted {
        show: ShowId,
    },
}

impl EngineEvent {
    /// User-facing form, if this event has one
    pub fn into_hub_event(self, source: SourceId) -> Option<HubEvent> {
        let event = match self {
            Self::StateChanged { state } => HubEvent::StateChanged { source, state },
            Self::TrackChanged { index, title } => HubEvent::TrackChanged {
                source,
                index,
                title,
            },
            Self::TrackReady { index } => HubEvent::TrackReady { source, index },
            Self::TrackFailed {
                index,
                error,
                terminal,
            } => HubEvent::TrackFailed {
                source,
                index,
                error: error.to_string(),
                terminal,
            },
            Self::RetryScheduled {
                index,
                attempt,
                delay,
            } => HubEvent::RetryScheduled {
                source,
                index,
                attempt,
                delay,
            },
            Self::TrackEnded { index } => HubEvent::TrackEnded { source, index },
            Self::Progress {
                index,
                elapsed,
                duration,
            } => HubEvent::Progress {
                source,
                index,
                elapsed,
                duration,
            },
            Self::ShowCompleted { show } => HubEvent::ShowCompleted { source, show },
            Self::StartRequested | Self::History(_) => return None,
        };
        Some(event)
    }
}

/// Events emitted by the playback hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HubEvent {
    /// Engine state changed
    StateChanged {
        source: SourceId,
        state: PlaybackState,
    },

    /// Current track changed, before it is ready
    TrackChanged {
        source: SourceId,
        index: usize,
        title: String,
    },

    TrackReady {
        source: SourceId,
        index: usize,
    },

    /// Track failed to load
    ///
    /// Non-terminal failures are retried automatically and are informational.
    TrackFailed {
        source: SourceId,
        index: usize,
        error: String,
        terminal: bool,
    },

    RetryScheduled {
        source: SourceId,
        index: usize,
        attempt: u32,
        delay: Duration,
    },

    TrackEnded {
        source: SourceId,
        index: usize,
    },

    /// Position update (periodic, while playing)
    Progress {
        source: SourceId,
        index: usize,
        elapsed: f64,
        duration: Option<f64>,
    },

    /// Last track of the show played to the end
    ShowCompleted { source: SourceId, show: ShowId },

    /// Resolving a requested show failed
    ShowLoadFailed {
        source: SourceId,
        show: ShowId,
        error: String,
    },

    ActiveSourceChanged { active: Option<SourceId> },

    NetworkChanged { state: NetworkState },

    FavoriteChanged { show: ShowId, favorite: bool },
}

impl HubEvent {
    /// Source the event concerns, if any
    pub fn source(&self) -> Option<SourceId> {
        match self {
            Self::StateChanged { source, .. }
            | Self::TrackChanged { source, .. }
            | Self::TrackReady { source, .. }
            | Self::TrackFailed { source, .. }
            | Self::RetryScheduled { source, .. }
            | Self::TrackEnded { source, .. }
            | Self::Progress { source, .. }
            | Self::ShowCompleted { source, .. }
            | Self::ShowLoadFailed { source, .. } => Some(*source),
            Self::ActiveSourceChanged { .. }
            | Self::NetworkChanged { .. }
            | Self::FavoriteChanged { .. } => None,
        }
    }
}
