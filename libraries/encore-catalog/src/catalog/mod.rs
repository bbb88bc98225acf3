//! Show catalogs.
//!
//! A catalog turns a show identifier into a `ShowListing` and owns the
//! resolver that turns that listing into a playlist.

mod archive;
mod bundled;

pub use archive::ArchiveCatalog;
pub use bundled::{BundledShow, StaticCatalog};

use crate::error::Result;
use crate::listing::ShowListing;
use crate::resolver::ResourceResolver;
use async_trait::async_trait;
use encore_core::{Playlist, ShowId};

/// Source of show listings for one content source
#[async_trait]
pub trait ShowCatalog: Send + Sync {
    /// Fetch the ordered file listing for a show
    async fn listing(&self, show: &ShowId) -> Result<ShowListing>;

    fn resolver(&self) -> &ResourceResolver;

    /// Fetch and resolve a show, requiring `start_index` to be playable
    async fn resolve(&self, show: &ShowId, start_index: usize) -> Result<Playlist> {
        let listing = self.listing(show).await?;
        Ok(self.resolver().resolve(show, &listing, start_index)?)
    }
}
