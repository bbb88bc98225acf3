//! Encore Core
//!
//! Platform-agnostic types, traits, and error handling for the Encore
//! concert player.
//!
//! This crate provides the building blocks shared by the catalog resolver,
//! the playback engines and the applications:
//! - **Domain Types**: `ShowId`, `SourceId`, `Track`, `PlaylistResource`, `Playlist`,
//!   `NetworkState`, `PlaybackState`
//! - **Collaborator Traits**: `HistorySink`, `KeyValueStore`
//! - **Error Handling**: one error kind per failure class plus the `EncoreError` umbrella
//!
//! # Example
//!
//! ```rust
//! use encore_core::{ByteRange, PlaylistResource, ShowId, SourceId, Track};
//! use url::Url;
//!
//! let show = ShowId::new("gd1977-05-08.sbd.hicks.4982.sbeok.shnf");
//! let track = Track::new(0, "Scarlet Begonias", "gd77-05-08d2t01.mp3");
//! let resource = PlaylistResource {
//!     track_index: 0,
//!     url: Url::parse("https://archive.org/download/show/gd77-05-08d2t01.mp3").unwrap(),
//!     range_hint: Some(ByteRange::open_ended()),
//!     is_likely_large_single_file: false,
//! };
//!
//! assert_eq!(SourceId::Dead.as_str(), "dead");
//! assert_eq!(resource.track_index, track.index);
//! assert_eq!(show.as_str(), "gd1977-05-08.sbd.hicks.4982.sbeok.shnf");
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod storage;
pub mod traits;
pub mod types;

pub use error::{EncoreError, LoadError, ResolutionError, Result, SeekError, SessionError};
pub use storage::MemoryStore;
pub use traits::{HistorySink, KeyValueStore};
pub use types::{
    ByteRange, InterfaceClass, NetworkState, PlaybackState, Playlist, PlaylistEntry,
    PlaylistResource, ShowId, SourceId, Track,
};
