//! Show listing to playlist resolution.
//!
//! Pure: no I/O beyond building and validating locators.
//!
//! Policy for entries whose locator cannot be built: if the entry is the
//! one playback must start with, the whole resolve fails. Any other bad
//! entry stays in the playlist at its index as a placeholder carrying
//! `ResolutionError::InvalidResource`, so track numbering never shifts and
//! the failure surfaces only when playback reaches it.

use crate::error::{CatalogError, Result};
use crate::listing::{ListingTrack, ShowListing};
use crate::locator::{build_locator, is_likely_large_single_file, parse_override, validate_base};
use crate::profile::CatalogProfile;
use encore_core::{
    ByteRange, Playlist, PlaylistEntry, PlaylistResource, ResolutionError, ShowId, Track,
};
use tracing::{debug, warn};
use url::Url;

/// Builds playlists for one catalog
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    profile: CatalogProfile,
    download_base: Url,
}

impl ResourceResolver {
    /// Create a resolver, validating the profile's download base
    pub fn new(profile: CatalogProfile) -> Result<Self> {
        let download_base =
            validate_base(&profile.download_base).map_err(CatalogError::invalid_base)?;
        Ok(Self {
            profile,
            download_base,
        })
    }

    pub fn profile(&self) -> &CatalogProfile {
        &self.profile
    }

    /// Resolve every track of `listing`
    ///
    /// `required_index` is the track playback will start with; failing to
    /// resolve it fails the whole batch.
    pub fn resolve(
        &self,
        show: &ShowId,
        listing: &ShowListing,
        required_index: usize,
    ) -> std::result::Result<Playlist, ResolutionError> {
        if listing.tracks.is_empty() {
            return Err(ResolutionError::NoPlayableTracks(show.clone()));
        }
        if required_index >= listing.tracks.len() {
            return Err(ResolutionError::invalid_resource(
                required_index,
                format!("show has only {} tracks", listing.tracks.len()),
            ));
        }

        let mut entries = Vec::with_capacity(listing.tracks.len());
        for (index, file) in listing.tracks.iter().enumerate() {
            let track = Track {
                index,
                title: file.display_title(),
                filename: file.filename.clone(),
                length_hint: file.length.clone(),
                set_label: file.set_label.clone(),
            };

            match self.resource_for(index, &listing.folder, file) {
                Ok(resource) => entries.push(PlaylistEntry::resolved(track, resource)),
                Err(err) if index == required_index => {
                    warn!(show = %show, index, error = %err, "Required track cannot be resolved");
                    return Err(err);
                }
                Err(err) => {
                    debug!(show = %show, index, error = %err, "Keeping placeholder for bad entry");
                    entries.push(PlaylistEntry::placeholder(track, err));
                }
            }
        }

        let mut playlist = Playlist::new(show.clone(), entries);
        playlist.show_title = listing.title.clone();

        debug!(
            show = %show,
            tracks = playlist.len(),
            invalid = playlist.invalid_count(),
            "Resolved show"
        );
        Ok(playlist)
    }

    fn resource_for(
        &self,
        index: usize,
        folder: &str,
        file: &ListingTrack,
    ) -> std::result::Result<PlaylistResource, ResolutionError> {
        let url = match file.url.as_deref() {
            Some(raw) => parse_override(raw),
            None => build_locator(&self.download_base, folder, &file.filename),
        }
        .map_err(|reason| ResolutionError::invalid_resource(index, reason))?;

        let large = is_likely_large_single_file(&file.filename);
        let range_hint = if large {
            ByteRange::leading(self.profile.initial_range_bytes)
        } else {
            ByteRange::open_ended()
        };

        Ok(PlaylistResource {
            track_index: index,
            url,
            range_hint: Some(range_hint),
            is_likely_large_single_file: large,
        })
    }
}
