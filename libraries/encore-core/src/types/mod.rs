mod ids;
mod network;
mod playback_state;
mod playlist;
mod track;

pub use ids::{ShowId, SourceId};
pub use network::{InterfaceClass, NetworkState};
pub use playback_state::PlaybackState;
pub use playlist::{Playlist, PlaylistEntry};
pub use track::{ByteRange, PlaylistResource, Track};
