//! Simulated media stack
//!
//! Nothing is fetched or decoded. An item "plays" for its track's length
//! hint, divided by the time scale, and then reports that it ended.

use async_trait::async_trait;
use encore_core::{LoadError, Playlist};
use encore_playback::{ItemId, ItemRequest, MediaBackend, MediaPlayer, PlayerEvent, PlayerEventSender};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

/// Used when a track carries no usable length hint
const DEFAULT_TRACK_LENGTH: Duration = Duration::from_secs(180);
/// Pretend connection and pre-roll time
const CONNECT_DELAY: Duration = Duration::from_millis(40);

#[derive(Debug, Clone)]
pub struct SimulatedItem {
    pub track_index: usize,
    pub url: Url,
    /// Seconds of show time
    pub length: f64,
}

/// Item factory knowing each locator's length
pub struct SimulatedBackend {
    lengths: HashMap<Url, f64>,
}

impl SimulatedBackend {
    pub fn new(playlist: &Playlist) -> Self {
        let lengths = playlist
            .entries
            .iter()
            .filter_map(|entry| {
                let resource = entry.resource.as_ref().ok()?;
                let length = entry
                    .track
                    .length_hint_duration()
                    .unwrap_or(DEFAULT_TRACK_LENGTH);
                Some((resource.url.clone(), length.as_secs_f64()))
            })
            .collect();
        Self { lengths }
    }

    fn item_for(&self, request: &ItemRequest) -> SimulatedItem {
        SimulatedItem {
            track_index: request.track_index,
            url: request.url.clone(),
            length: self
                .lengths
                .get(&request.url)
                .copied()
                .unwrap_or(DEFAULT_TRACK_LENGTH.as_secs_f64()),
        }
    }
}

#[async_trait]
impl MediaBackend for SimulatedBackend {
    type Item = SimulatedItem;

    fn create_item(&self, request: &ItemRequest) -> SimulatedItem {
        self.item_for(request)
    }

    async fn prepare_item(&self, request: ItemRequest) -> Result<SimulatedItem, LoadError> {
        tokio::time::sleep(CONNECT_DELAY).await;
        trace!(index = request.track_index, range = %request.range.header_value(), "Pre-rolled");
        Ok(self.item_for(&request))
    }
}

/// Player whose clock runs `time_scale` times faster than real time
pub struct SimulatedPlayer {
    events: PlayerEventSender,
    time_scale: f64,
    current: Option<(ItemId, SimulatedItem)>,
    volume: f32,
    /// Show-time position when the clock last stopped
    position: f64,
    started_at: Option<Instant>,
    timer: Option<CancellationToken>,
}

impl SimulatedPlayer {
    pub fn new(events: PlayerEventSender, time_scale: f64) -> Self {
        Self {
            events,
            time_scale: if time_scale.is_finite() && time_scale > 0.0 {
                time_scale
            } else {
                1.0
            },
            current: None,
            volume: 1.0,
            position: 0.0,
            started_at: None,
            timer: None,
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn stop_clock(&mut self) {
        self.position = self.elapsed();
        self.started_at = None;
        self.cancel_timer();
    }

    /// Schedule `ItemEnded` for the remaining show time
    fn arm_end_timer(&mut self) {
        self.cancel_timer();
        let Some((item, current)) = self.current.as_ref() else {
            return;
        };
        let remaining = (current.length - self.position).max(0.0) / self.time_scale;
        let item = *item;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(Duration::from_secs_f64(remaining)) => {
                    events.send(PlayerEvent::ItemEnded { item });
                }
            }
        });
        self.timer = Some(token);
    }
}

impl MediaPlayer for SimulatedPlayer {
    type Item = SimulatedItem;

    fn replace_current(&mut self, id: ItemId, item: SimulatedItem) {
        self.cancel_timer();
        self.started_at = None;
        self.position = 0.0;
        debug!(item = %id, index = item.track_index, url = %item.url, "Simulated load");
        self.current = Some((id, item));

        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(CONNECT_DELAY).await;
            events.send(PlayerEvent::ItemReady { item: id });
        });
    }

    fn clear(&mut self) {
        self.stop_clock();
        self.current = None;
        self.position = 0.0;
    }

    fn play(&mut self) {
        if self.current.is_none() || self.started_at.is_some() {
            return;
        }
        self.started_at = Some(Instant::now());
        self.arm_end_timer();
    }

    fn pause(&mut self) {
        if self.started_at.is_some() {
            self.stop_clock();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn seek(&mut self, position: f64) {
        let playing = self.started_at.is_some();
        self.stop_clock();
        self.position = position.max(0.0);
        if playing {
            self.started_at = Some(Instant::now());
            self.arm_end_timer();
        }
    }

    fn duration(&self) -> Option<f64> {
        self.current.as_ref().map(|(_, item)| item.length)
    }

    fn elapsed(&self) -> f64 {
        let running = self
            .started_at
            .map_or(0.0, |started| started.elapsed().as_secs_f64() * self.time_scale);
        self.position + running
    }
}
