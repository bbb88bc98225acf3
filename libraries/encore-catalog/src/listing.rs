//! Catalog-neutral show listing.
//!
//! Both catalogs reduce their metadata to a `ShowListing` before the
//! resolver turns it into locators.

use serde::{Deserialize, Serialize};

/// Ordered files of one show, before locator construction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShowListing {
    /// Folder under the download base (usually the show identifier)
    pub folder: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub tracks: Vec<ListingTrack>,
}

/// One file in a listing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListingTrack {
    pub filename: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Raw length ("312.45" or "5:12")
    #[serde(default)]
    pub length: Option<String>,

    #[serde(default)]
    pub set_label: Option<String>,

    /// Explicit locator, used instead of the folder template
    #[serde(default)]
    pub url: Option<String>,
}

impl ListingTrack {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_length(mut self, length: impl Into<String>) -> Self {
        self.length = Some(length.into());
        self
    }

    /// Title, falling back to the filename without its extension
    pub fn display_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => {
                let name = self.filename.rsplit('/').next().unwrap_or(&self.filename);
                match name.rsplit_once('.') {
                    Some((stem, _)) if !stem.is_empty() => stem.to_string(),
                    _ => name.to_string(),
                }
            }
        }
    }
}
