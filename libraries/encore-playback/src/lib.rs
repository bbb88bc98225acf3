//! Encore - Playback Coordination
//!
//! Platform-agnostic playback for the two concert catalogs and the video slot.
//!
//! This crate provides:
//! - One [`PlaybackEngine`] per catalog: show state, fades, retry with backoff
//! - A bounded look-ahead [`TrackBuffer`] that follows the network policy
//! - A [`NetworkMonitor`] publishing connectivity on a `watch` channel
//! - A [`PlaybackCoordinator`] that keeps at most one source audible
//! - A [`HistoryBook`] implementing the history contract on a key-value store
//! - The [`PlaybackHub`] control loop tying it all together
//!
//! # Architecture
//!
//! Nothing here talks to a real audio stack. Players and item construction
//! are supplied through the [`MediaPlayer`] and [`MediaBackend`] traits, and
//! the video player through [`VideoPlayer`].
//!
//! Engines are plain synchronous state machines. Timers, fades and preloads
//! run as tokio tasks that only post messages back; the hub applies every
//! message on one task, so no engine state is ever shared.
//!
//! # Example: Volume ramp
//!
//! ```rust
//! use encore_playback::{FadeDirection, PlaybackConfig, VolumeRamp};
//!
//! let config = PlaybackConfig::default();
//! let ramp = VolumeRamp::new(1.0, 0.0, config.fade_steps);
//!
//! assert_eq!(ramp.direction(), FadeDirection::Out);
//! assert_eq!(ramp.level_at(config.fade_steps), 0.0);
//! assert!(ramp.is_last(config.fade_steps));
//! ```

pub mod backend;
pub mod buffer;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod hub;
pub mod mailbox;
pub mod network;
pub mod ramp;
pub mod remote;
pub mod retry;
pub mod video;

pub use backend::{ItemId, ItemRequest, MediaBackend, MediaPlayer, PlayerEvent, PlayerEventSender};
pub use buffer::{BufferPolicy, BufferedItem, PlayableItem, TrackBuffer};
pub use config::PlaybackConfig;
pub use coordinator::{Pausable, PlaybackCoordinator, StartDecision};
pub use engine::PlaybackEngine;
pub use error::{PlaybackError, Result, TrackFailure};
pub use events::{EngineEvent, HistoryMark, HubEvent};
pub use history::HistoryBook;
pub use hub::{HubBuilder, HubCommand, HubHandle, PlaybackHub};
pub use mailbox::{EngineMessage, Envelope, Mailbox, Preloaded};
pub use network::{NetworkMonitor, PathUpdate};
pub use ramp::{FadeDirection, VolumeRamp};
pub use remote::{NowPlaying, RemoteCommand};
pub use retry::{RetryDecision, RetryState};
pub use video::{VideoCommand, VideoPlayer, VideoSlot};
