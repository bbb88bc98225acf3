//! Catalog backed by a bundled JSON listing.
//!
//! ```json
//! {"shows": [{"id": "jg1976-07-18", "folder": "jgb1976-07-18", "title": "...",
//!             "tracks": [{"filename": "t01.mp3", "title": "Sugaree", "set_label": "Set 1"}]}]}
//! ```

use super::ShowCatalog;
use crate::error::{CatalogError, Result};
use crate::listing::{ListingTrack, ShowListing};
use crate::profile::CatalogProfile;
use crate::resolver::ResourceResolver;
use async_trait::async_trait;
use encore_core::ShowId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One show in the bundled listing file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundledShow {
    pub id: ShowId,

    /// Defaults to the show id
    #[serde(default)]
    pub folder: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub tracks: Vec<ListingTrack>,
}

#[derive(Debug, Deserialize)]
struct BundledFile {
    #[serde(default)]
    shows: Vec<BundledShow>,
}

/// Catalog that never touches the network for listings
pub struct StaticCatalog {
    shows: HashMap<ShowId, ShowListing>,
    resolver: ResourceResolver,
}

impl StaticCatalog {
    pub fn new(profile: CatalogProfile, shows: Vec<BundledShow>) -> Result<Self> {
        let resolver = ResourceResolver::new(profile)?;
        let shows = shows
            .into_iter()
            .map(|show| {
                let listing = ShowListing {
                    folder: show.folder.unwrap_or_else(|| show.id.as_str().to_string()),
                    title: show.title,
                    tracks: show.tracks,
                };
                (show.id, listing)
            })
            .collect();

        Ok(Self { shows, resolver })
    }

    /// Parse a bundled listing document
    pub fn from_json(profile: CatalogProfile, json: &str) -> Result<Self> {
        let file: BundledFile = serde_json::from_str(json)
            .map_err(|e| CatalogError::parse(format!("bundled listing: {e}")))?;
        debug!(shows = file.shows.len(), "Loaded bundled listing");
        Self::new(profile, file.shows)
    }

    pub fn len(&self) -> usize {
        self.shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    /// Show ids in sorted order
    pub fn show_ids(&self) -> Vec<ShowId> {
        let mut ids: Vec<ShowId> = self.shows.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ShowCatalog for StaticCatalog {
    async fn listing(&self, show: &ShowId) -> Result<ShowListing> {
        self.shows
            .get(show)
            .cloned()
            .ok_or_else(|| CatalogError::ShowNotFound(show.clone()))
    }

    fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }
}
