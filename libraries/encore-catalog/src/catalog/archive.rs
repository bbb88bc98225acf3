//! HTTP-backed catalog reading the archive's metadata index.

use super::ShowCatalog;
use crate::error::{CatalogError, Result};
use crate::listing::ShowListing;
use crate::locator::validate_base;
use crate::metadata::MetadataIndex;
use crate::profile::CatalogProfile;
use crate::resolver::ResourceResolver;
use async_trait::async_trait;
use encore_core::ShowId;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Catalog whose listings come from `<metadata_base>/<show id>`
pub struct ArchiveCatalog {
    http: Client,
    metadata_base: Url,
    resolver: ResourceResolver,
}

impl ArchiveCatalog {
    /// Create a catalog for the given profile
    pub fn new(profile: CatalogProfile) -> Result<Self> {
        let metadata_base =
            validate_base(&profile.metadata_base).map_err(CatalogError::invalid_base)?;
        let resolver = ResourceResolver::new(profile)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Encore/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            metadata_base,
            resolver,
        })
    }

    /// Fetch the raw metadata index for a show
    pub async fn fetch_index(&self, show: &ShowId) -> Result<MetadataIndex> {
        let mut url = self.metadata_base.clone();
        url.path_segments_mut()
            .map_err(|()| CatalogError::invalid_base(self.metadata_base.as_str()))?
            .pop_if_empty()
            .push(show.as_str());

        debug!(url = %url, "Fetching metadata index");

        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::ShowNotFound(show.clone()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let index: MetadataIndex = serde_json::from_str(&body)
            .map_err(|e| CatalogError::parse(format!("metadata for {show}: {e}")))?;

        if index.is_empty() {
            return Err(CatalogError::ShowNotFound(show.clone()));
        }

        info!(
            show = %show,
            files = index.files.len(),
            "Fetched metadata index"
        );
        Ok(index)
    }
}

#[async_trait]
impl ShowCatalog for ArchiveCatalog {
    async fn listing(&self, show: &ShowId) -> Result<ShowListing> {
        let index = self.fetch_index(show).await?;
        Ok(index.to_listing(show.as_str(), self.resolver.profile()))
    }

    fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }
}
