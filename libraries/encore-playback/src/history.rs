//! Listening history and favorites
//!
//! Bounded list of recently played shows plus partial/completed/favorite
//! sets, persisted through a [`KeyValueStore`] as one JSON blob per key.

use encore_core::{HistorySink, KeyValueStore, ShowId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use tracing::warn;

const RECENT_KEY: &str = "history.recent";
const PARTIAL_KEY: &str = "history.partial";
const COMPLETED_KEY: &str = "history.completed";
const FAVORITES_KEY: &str = "history.favorites";

/// History with bounded recent list
///
/// Most recent show first. Adding a show already in the list moves it to
/// the front; when full, the oldest entry is discarded.
pub struct HistoryBook<S: KeyValueStore> {
    store: S,
    recent: VecDeque<ShowId>,
    partial: BTreeSet<ShowId>,
    completed: BTreeSet<ShowId>,
    favorites: BTreeSet<ShowId>,
    max_size: usize,
}

impl<S: KeyValueStore> HistoryBook<S> {
    /// Load whatever the store holds; unreadable blobs start empty
    pub fn load(store: S, max_size: usize) -> Self {
        let mut recent: VecDeque<ShowId> = read_blob(&store, RECENT_KEY);
        recent.truncate(max_size);
        Self {
            partial: read_blob(&store, PARTIAL_KEY),
            completed: read_blob(&store, COMPLETED_KEY),
            favorites: read_blob(&store, FAVORITES_KEY),
            recent,
            store,
            max_size,
        }
    }

    /// Most recent first
    pub fn recent(&self) -> Vec<&ShowId> {
        self.recent.iter().collect()
    }

    pub fn is_partial(&self, show: &ShowId) -> bool {
        self.partial.contains(show)
    }

    pub fn is_completed(&self, show: &ShowId) -> bool {
        self.completed.contains(show)
    }

    pub fn favorites(&self) -> Vec<&ShowId> {
        self.favorites.iter().collect()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Clear the recent list (partial/completed/favorites are kept)
    pub fn clear_recent(&mut self) {
        self.recent.clear();
        write_blob(&mut self.store, RECENT_KEY, &self.recent);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S: KeyValueStore> HistorySink for HistoryBook<S> {
    fn add_to_history(&mut self, show: &ShowId) {
        self.recent.retain(|s| s != show);
        self.recent.push_front(show.clone());
        self.recent.truncate(self.max_size);
        write_blob(&mut self.store, RECENT_KEY, &self.recent);
    }

    fn mark_partial(&mut self, show: &ShowId) {
        if self.completed.contains(show) || !self.partial.insert(show.clone()) {
            return;
        }
        write_blob(&mut self.store, PARTIAL_KEY, &self.partial);
    }

    fn mark_completed(&mut self, show: &ShowId) {
        if self.partial.remove(show) {
            write_blob(&mut self.store, PARTIAL_KEY, &self.partial);
        }
        if self.completed.insert(show.clone()) {
            write_blob(&mut self.store, COMPLETED_KEY, &self.completed);
        }
    }

    fn toggle_favorite(&mut self, show: &ShowId) -> bool {
        let now_favorite = if self.favorites.remove(show) {
            false
        } else {
            self.favorites.insert(show.clone());
            true
        };
        write_blob(&mut self.store, FAVORITES_KEY, &self.favorites);
        now_favorite
    }

    fn is_favorite(&self, show: &ShowId) -> bool {
        self.favorites.contains(show)
    }
}

fn read_blob<T: DeserializeOwned + Default>(store: &impl KeyValueStore, key: &str) -> T {
    let Some(raw) = store.get(key) else {
        return T::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(key, error = %e, "Discarding unreadable history blob");
        T::default()
    })
}

fn write_blob<T: Serialize>(store: &mut impl KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => store.set(key, json),
        Err(e) => warn!(key, error = %e, "Failed to encode history blob"),
    }
}
