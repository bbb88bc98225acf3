//! Archive metadata index.
//!
//! Shape of the archive's `/metadata/<identifier>` document, reduced to the
//! fields the resolver needs. Every field is optional; the archive omits
//! freely and occasionally returns `{}` for unknown identifiers.

use crate::listing::{ListingTrack, ShowListing};
use crate::profile::CatalogProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataIndex {
    #[serde(default)]
    pub metadata: Option<ItemMetadata>,

    #[serde(default)]
    pub files: Vec<MetadataFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataFile {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub length: Option<String>,

    #[serde(default)]
    pub size: Option<String>,

    #[serde(default)]
    pub bitrate: Option<String>,
}

impl MetadataIndex {
    /// An item the archive does not know about
    pub fn is_empty(&self) -> bool {
        self.metadata.is_none() && self.files.is_empty()
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref()?.title.as_deref()
    }

    /// Select playable audio files and order them by filename
    ///
    /// Files without a name or format, in a format the profile does not
    /// accept, or carrying a low quality marker are skipped.
    pub fn select_audio<'a>(&'a self, profile: &CatalogProfile) -> Vec<&'a MetadataFile> {
        let mut selected: Vec<&MetadataFile> = self
            .files
            .iter()
            .filter(|file| {
                let (Some(name), Some(format)) = (file.name.as_deref(), file.format.as_deref())
                else {
                    return false;
                };
                profile.accepts_format(format) && !profile.is_low_quality(name)
            })
            .collect();

        selected.sort_by(|a, b| a.name.cmp(&b.name));
        selected
    }

    /// Reduce to a listing rooted at `folder`
    pub fn to_listing(&self, folder: &str, profile: &CatalogProfile) -> ShowListing {
        let tracks = self
            .select_audio(profile)
            .into_iter()
            .map(|file| ListingTrack {
                filename: file.name.clone().unwrap_or_default(),
                title: file.title.clone(),
                length: file.length.clone(),
                set_label: None,
                url: None,
            })
            .collect();

        ShowListing {
            folder: folder.to_string(),
            title: self.title().map(str::to_string),
            tracks,
        }
    }
}
