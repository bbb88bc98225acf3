/// Resolved show playlist
use crate::error::ResolutionError;
use crate::types::{PlaylistResource, ShowId, Track};

/// One track plus the outcome of resolving its locator
///
/// A failed resolution is kept in place so indices stay stable; playback
/// fails fast when it reaches the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub track: Track,
    pub resource: Result<PlaylistResource, ResolutionError>,
}

impl PlaylistEntry {
    pub fn resolved(track: Track, resource: PlaylistResource) -> Self {
        Self {
            track,
            resource: Ok(resource),
        }
    }

    pub fn placeholder(track: Track, error: ResolutionError) -> Self {
        Self {
            track,
            resource: Err(error),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resource.is_ok()
    }
}

/// Ordered tracks for one show
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub show_id: ShowId,
    pub show_title: Option<String>,
    pub entries: Vec<PlaylistEntry>,
}

impl Playlist {
    pub fn new(show_id: ShowId, entries: Vec<PlaylistEntry>) -> Self {
        Self {
            show_id,
            show_title: None,
            entries,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.show_title = Some(title.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.entries.len().checked_sub(1)
    }

    /// Resolved resource at `index`, if the entry exists and resolved
    pub fn resource(&self, index: usize) -> Option<&PlaylistResource> {
        self.entry(index).and_then(|entry| entry.resource.as_ref().ok())
    }

    /// Number of entries that failed to resolve
    pub fn invalid_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_resolved()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn resource(index: usize) -> PlaylistResource {
        PlaylistResource {
            track_index: index,
            url: Url::parse(&format!("https://example.org/s/t{index}.mp3")).unwrap(),
            range_hint: None,
            is_likely_large_single_file: false,
        }
    }

    #[test]
    fn placeholder_keeps_index_stable() {
        let playlist = Playlist::new(
            ShowId::new("s"),
            vec![
                PlaylistEntry::resolved(Track::new(0, "a", "t0.mp3"), resource(0)),
                PlaylistEntry::placeholder(
                    Track::new(1, "b", ""),
                    ResolutionError::invalid_resource(1, "empty filename"),
                ),
                PlaylistEntry::resolved(Track::new(2, "c", "t2.mp3"), resource(2)),
            ],
        );

        assert_eq!(playlist.len(), 3);
        assert_eq!(playlist.last_index(), Some(2));
        assert!(playlist.resource(1).is_none());
        assert_eq!(playlist.resource(2).map(|r| r.track_index), Some(2));
        assert_eq!(playlist.invalid_count(), 1);
    }

    #[test]
    fn empty_playlist_has_no_last_index() {
        let playlist = Playlist::new(ShowId::new("s"), Vec::new());
        assert!(playlist.is_empty());
        assert_eq!(playlist.last_index(), None);
    }
}
