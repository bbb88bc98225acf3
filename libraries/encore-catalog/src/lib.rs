//! Encore Catalog
//!
//! Turns a show identifier into an ordered, validated playlist.
//!
//! - [`ResourceResolver`]: pure listing-to-playlist resolution with
//!   percent-encoded locators and per-entry validation
//! - [`MetadataIndex`]: the archive's JSON metadata document and audio file selection
//! - [`ShowCatalog`]: async source of listings, implemented by
//!   [`ArchiveCatalog`] (HTTP) and [`StaticCatalog`] (bundled JSON)
//!
//! # Example
//!
//! ```rust
//! use encore_catalog::{CatalogProfile, ListingTrack, ResourceResolver, ShowListing};
//! use encore_core::ShowId;
//!
//! let resolver = ResourceResolver::new(CatalogProfile::default()).unwrap();
//! let listing = ShowListing {
//!     folder: "gd1977-05-08".into(),
//!     title: None,
//!     tracks: vec![ListingTrack::new("gd77-05-08d1t01.mp3")],
//! };
//!
//! let playlist = resolver.resolve(&ShowId::new("gd1977-05-08"), &listing, 0).unwrap();
//! assert_eq!(playlist.len(), 1);
//! ```

pub mod catalog;
pub mod error;
pub mod listing;
pub mod locator;
pub mod metadata;
pub mod profile;
pub mod resolver;

pub use catalog::{ArchiveCatalog, BundledShow, ShowCatalog, StaticCatalog};
pub use error::{CatalogError, Result};
pub use listing::{ListingTrack, ShowListing};
pub use metadata::{MetadataFile, MetadataIndex};
pub use profile::CatalogProfile;
pub use resolver::ResourceResolver;
