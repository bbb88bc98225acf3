//! Current item construction and look-ahead preloading
//!
//! The buffer owns the map of preloaded items keyed by track index. Only
//! the control loop mutates it: preload tasks run in the background and
//! hand their results back through the engine mailbox, where [`TrackBuffer::merge`]
//! decides whether they still belong.
//!
//! Policy, from the latest [`NetworkState`]:
//! - no preloading at all while the network is unavailable
//! - on cellular, one track of look-ahead, and nothing more once anything
//!   is buffered or in flight
//! - 60s forward buffer on Wi-Fi, 30s otherwise
//! - an open-ended range for per-song files, a short leading range for
//!   whole-set single files

use crate::backend::{ItemId, ItemRequest, MediaBackend};
use crate::config::PlaybackConfig;
use crate::mailbox::{EngineMessage, Mailbox, Preloaded};
use encore_core::{ByteRange, NetworkState, Playlist, PlaylistResource};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Item ready to become the current one
#[derive(Debug)]
pub struct PlayableItem<I> {
    pub track_index: usize,
    pub item_id: ItemId,
    pub item: I,
    pub range: ByteRange,
    pub preferred_buffer: Duration,
}

/// Preloaded look-ahead entry
#[derive(Debug)]
pub struct BufferedItem<I> {
    pub playable: PlayableItem<I>,
    pub created_at: Instant,
}

impl<I> BufferedItem<I> {
    pub fn track_index(&self) -> usize {
        self.playable.track_index
    }
}

/// Size and range rules derived from config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    pub wifi_buffer: Duration,
    pub constrained_buffer: Duration,
    pub large_file_range_bytes: u64,
}

impl BufferPolicy {
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self {
            wifi_buffer: config.wifi_buffer(),
            constrained_buffer: config.constrained_buffer(),
            large_file_range_bytes: config.large_file_initial_range_bytes,
        }
    }

    pub fn preferred_buffer(&self, network: NetworkState) -> Duration {
        if network.is_wifi() {
            self.wifi_buffer
        } else {
            self.constrained_buffer
        }
    }

    /// Range to request; an explicit hint on the resource wins
    pub fn range_for(&self, resource: &PlaylistResource) -> ByteRange {
        match resource.range_hint {
            Some(range) => range,
            None if resource.is_likely_large_single_file => {
                ByteRange::leading(self.large_file_range_bytes)
            }
            None => ByteRange::open_ended(),
        }
    }
}

/// Current-item factory plus bounded look-ahead map
pub struct TrackBuffer<B: MediaBackend> {
    backend: Arc<B>,
    network: watch::Receiver<NetworkState>,
    policy: BufferPolicy,
    entries: HashMap<usize, BufferedItem<B::Item>>,
    in_flight: HashSet<usize>,
    /// Bumped by `invalidate_all`; results from older epochs are stale
    epoch: u64,
    cancel: CancellationToken,
    next_item_id: u64,
}

impl<B: MediaBackend> TrackBuffer<B> {
    pub fn new(
        backend: Arc<B>,
        network: watch::Receiver<NetworkState>,
        policy: BufferPolicy,
    ) -> Self {
        Self {
            backend,
            network,
            policy,
            entries: HashMap::new(),
            in_flight: HashSet::new(),
            epoch: 0,
            cancel: CancellationToken::new(),
            next_item_id: 0,
        }
    }

    pub fn network(&self) -> NetworkState {
        *self.network.borrow()
    }

    fn allocate_id(&mut self) -> ItemId {
        self.next_item_id += 1;
        ItemId(self.next_item_id)
    }

    fn request_for(&self, resource: &PlaylistResource, network: NetworkState) -> ItemRequest {
        ItemRequest {
            track_index: resource.track_index,
            url: resource.url.clone(),
            range: self.policy.range_for(resource),
            preferred_buffer: self.policy.preferred_buffer(network),
        }
    }

    /// Build the item for the track about to play, without waiting
    pub fn load_current(&mut self, resource: &PlaylistResource) -> PlayableItem<B::Item> {
        let request = self.request_for(resource, self.network());
        let item_id = self.allocate_id();
        debug!(
            index = resource.track_index,
            item = %item_id,
            range = %request.range.header_value(),
            buffer_secs = request.preferred_buffer.as_secs(),
            "Loading current track"
        );
        let item = self.backend.create_item(&request);
        PlayableItem {
            track_index: resource.track_index,
            item_id,
            item,
            range: request.range,
            preferred_buffer: request.preferred_buffer,
        }
    }

    /// Start background preparation of the next `limit` tracks
    ///
    /// Returns how many preparations were started. Never blocks.
    pub fn preload(
        &mut self,
        playlist: &Playlist,
        current: usize,
        limit: usize,
        mailbox: &Mailbox<B::Item>,
    ) -> usize {
        let network = self.network();
        if !network.available {
            debug!(current, "Network unavailable, skipping preload");
            return 0;
        }

        let mut limit = limit;
        if network.is_cellular() {
            if self.outstanding() > 0 {
                trace!(current, "Cellular look-ahead already buffered");
                return 0;
            }
            limit = limit.min(1);
        }

        let window_end = current.saturating_add(limit);
        let mut started = 0;
        for index in current + 1..=window_end {
            if self.outstanding_after(current) >= limit {
                break;
            }
            if self.entries.contains_key(&index) || self.in_flight.contains(&index) {
                continue;
            }
            let Some(resource) = playlist.resource(index) else {
                // past the end, or a placeholder that will fail when reached
                continue;
            };

            let request = self.request_for(resource, network);
            let item_id = self.allocate_id();
            self.in_flight.insert(index);
            self.spawn_prepare(index, item_id, request, mailbox.clone());
            started += 1;
        }

        if started > 0 {
            debug!(current, started, epoch = self.epoch, "Preloading look-ahead");
        }
        started
    }

    fn spawn_prepare(
        &self,
        index: usize,
        item_id: ItemId,
        request: ItemRequest,
        mailbox: Mailbox<B::Item>,
    ) {
        let backend = Arc::clone(&self.backend);
        let token = self.cancel.clone();
        let epoch = self.epoch;
        let range = request.range;
        let preferred_buffer = request.preferred_buffer;

        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    trace!(index, "Preload cancelled");
                }
                result = backend.prepare_item(request) => {
                    mailbox.post(EngineMessage::Preloaded(Preloaded {
                        epoch,
                        track_index: index,
                        item_id,
                        range,
                        preferred_buffer,
                        result,
                    }));
                }
            }
        });
    }

    /// Accept a finished preload if it still fits the look-ahead window
    pub fn merge(&mut self, preloaded: Preloaded<B::Item>, current: usize, limit: usize) -> bool {
        if preloaded.epoch != self.epoch {
            trace!(index = preloaded.track_index, "Dropping preload from an old show");
            return false;
        }
        let index = preloaded.track_index;
        self.in_flight.remove(&index);

        let item = match preloaded.result {
            Ok(item) => item,
            Err(err) => {
                warn!(index, error = %err, "Preload failed, will load on demand");
                return false;
            }
        };

        if index <= current || index > current.saturating_add(limit) {
            debug!(index, current, "Preload arrived outside the look-ahead window");
            return false;
        }
        if self.entries.contains_key(&index) || self.entries_after(current) >= limit {
            return false;
        }

        self.entries.insert(
            index,
            BufferedItem {
                playable: PlayableItem {
                    track_index: index,
                    item_id: preloaded.item_id,
                    item,
                    range: preloaded.range,
                    preferred_buffer: preloaded.preferred_buffer,
                },
                created_at: Instant::now(),
            },
        );
        debug!(index, buffered = self.entries.len(), "Preload buffered");
        true
    }

    /// Take the preloaded item for `index`, if any
    pub fn consume(&mut self, index: usize) -> Option<PlayableItem<B::Item>> {
        self.entries.remove(&index).map(|entry| {
            debug!(
                index,
                age_ms = entry.created_at.elapsed().as_millis() as u64,
                "Using preloaded item"
            );
            entry.playable
        })
    }

    /// Evict entries that are not within `limit` tracks after `current`
    pub fn retain_window(&mut self, current: usize, limit: usize) {
        let end = current.saturating_add(limit);
        self.entries
            .retain(|&index, _| index > current && index <= end);
    }

    /// Drop everything and cancel in-flight preloads
    pub fn invalidate_all(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch += 1;
        if !self.entries.is_empty() || !self.in_flight.is_empty() {
            debug!(
                dropped = self.entries.len(),
                cancelled = self.in_flight.len(),
                "Invalidated buffer"
            );
        }
        self.entries.clear();
        self.in_flight.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn buffered_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.entries.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Buffered entries plus preparations still running
    pub fn outstanding(&self) -> usize {
        self.entries.len() + self.in_flight.len()
    }

    fn entries_after(&self, current: usize) -> usize {
        self.entries.keys().filter(|&&index| index > current).count()
    }

    fn outstanding_after(&self, current: usize) -> usize {
        self.entries_after(current) + self.in_flight.iter().filter(|&&i| i > current).count()
    }
}
