/// Track and resource types
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// One track of a show
///
/// Immutable once resolved. `index` is the only ordering key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Position in the show (0-indexed)
    pub index: usize,

    /// Display title
    pub title: String,

    /// File name (or path) relative to the show folder
    pub filename: String,

    /// Raw length hint from the catalog ("312.45", "5:12", "1:02:33")
    pub length_hint: Option<String>,

    /// Set label ("Set 1", "Encore")
    pub set_label: Option<String>,
}

impl Track {
    /// Create a new track with minimal metadata
    pub fn new(index: usize, title: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            filename: filename.into(),
            length_hint: None,
            set_label: None,
        }
    }

    pub fn with_length_hint(mut self, hint: impl Into<String>) -> Self {
        self.length_hint = Some(hint.into());
        self
    }

    pub fn with_set_label(mut self, label: impl Into<String>) -> Self {
        self.set_label = Some(label.into());
        self
    }

    /// Parse the length hint into a duration
    ///
    /// Accepts plain seconds (`"312.45"`), `"m:ss"` and `"h:mm:ss"`.
    /// Returns `None` for missing, malformed, negative or non-finite hints.
    pub fn length_hint_duration(&self) -> Option<Duration> {
        parse_length_hint(self.length_hint.as_deref()?)
    }
}

fn parse_length_hint(hint: &str) -> Option<Duration> {
    let parts: Vec<&str> = hint.trim().split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut seconds = 0.0_f64;
    for part in &parts {
        let value: f64 = part.trim().parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        seconds = seconds * 60.0 + value;
    }

    Duration::try_from_secs_f64(seconds).ok()
}

/// HTTP byte range request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive end; `None` means to the end of the file
    pub end: Option<u64>,
}

impl ByteRange {
    /// `bytes=0-`
    pub const fn open_ended() -> Self {
        Self {
            start: 0,
            end: None,
        }
    }

    /// First `len` bytes of the file
    pub const fn leading(len: u64) -> Self {
        Self {
            start: 0,
            end: Some(len.saturating_sub(1)),
        }
    }

    /// Value for the `Range` request header
    pub fn header_value(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{}", self.start, end),
            None => format!("bytes={}-", self.start),
        }
    }

    /// Number of bytes requested, if bounded
    pub fn len(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(self.start) + 1)
    }
}

/// Resolved, fetchable locator for one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistResource {
    pub track_index: usize,
    pub url: Url,
    pub range_hint: Option<ByteRange>,
    /// Filename carries no track/disc markers, so this is probably a whole set in one file
    pub is_likely_large_single_file: bool,
}
