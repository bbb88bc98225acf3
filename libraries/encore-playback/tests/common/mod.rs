//! Shared fakes for playback integration tests
//!
//! The fake player reports readiness (or failure) right after
//! `replace_current`, which is what a real player does once the item has
//! buffered enough. Every fake records its calls behind an `Arc<Mutex<_>>`
//! so tests can inspect them while the hub owns the fake.

#![allow(dead_code)]

use async_trait::async_trait;
use encore_core::{
    ByteRange, HistorySink, LoadError, Playlist, PlaylistEntry, PlaylistResource,
    ResolutionError, ShowId, SourceId, Track,
};
use encore_playback::{
    HubBuilder, HubEvent, HubHandle, ItemId, ItemRequest, MediaBackend, MediaPlayer,
    PlaybackConfig, PlayerEvent, PlayerEventSender, VideoPlayer,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use url::Url;

// ===== Items and backend =====

#[derive(Debug, Clone, PartialEq)]
pub struct FakeItem {
    pub track_index: usize,
    pub url: Url,
    pub range: ByteRange,
    pub preferred_buffer: Duration,
}

impl FakeItem {
    fn from_request(request: &ItemRequest) -> Self {
        Self {
            track_index: request.track_index,
            url: request.url.clone(),
            range: request.range,
            preferred_buffer: request.preferred_buffer,
        }
    }
}

#[derive(Debug, Default)]
pub struct BackendLog {
    pub created: Vec<ItemRequest>,
    pub prepared: Vec<ItemRequest>,
    /// Track indices whose preloads fail
    pub failing_preloads: HashSet<usize>,
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    pub log: Arc<Mutex<BackendLog>>,
    pub prepare_delay: Duration,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prepare_delay(delay: Duration) -> Self {
        Self {
            prepare_delay: delay,
            ..Self::default()
        }
    }

    pub fn created_indices(&self) -> Vec<usize> {
        self.log
            .lock()
            .unwrap()
            .created
            .iter()
            .map(|r| r.track_index)
            .collect()
    }

    pub fn prepared_indices(&self) -> Vec<usize> {
        self.log
            .lock()
            .unwrap()
            .prepared
            .iter()
            .map(|r| r.track_index)
            .collect()
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    type Item = FakeItem;

    fn create_item(&self, request: &ItemRequest) -> FakeItem {
        self.log.lock().unwrap().created.push(request.clone());
        FakeItem::from_request(request)
    }

    async fn prepare_item(&self, request: ItemRequest) -> Result<FakeItem, LoadError> {
        let fails = {
            let mut log = self.log.lock().unwrap();
            log.prepared.push(request.clone());
            log.failing_preloads.contains(&request.track_index)
        };
        if !self.prepare_delay.is_zero() {
            tokio::time::sleep(self.prepare_delay).await;
        }
        if fails {
            return Err(LoadError::transient("preload refused"));
        }
        Ok(FakeItem::from_request(&request))
    }
}

// ===== Player =====

#[derive(Debug)]
pub struct PlayerLog {
    pub current: Option<(ItemId, FakeItem)>,
    pub loads: Vec<FakeItem>,
    pub playing: bool,
    pub volume: f32,
    pub volumes: Vec<f32>,
    pub plays: usize,
    pub pauses: usize,
    pub seeks: Vec<f64>,
    pub duration: Option<f64>,
    pub elapsed: f64,
    pub sessions: usize,
    /// Track indices whose loads fail
    pub failing: HashSet<usize>,
}

impl Default for PlayerLog {
    fn default() -> Self {
        Self {
            current: None,
            loads: Vec::new(),
            playing: false,
            volume: 1.0,
            volumes: Vec::new(),
            plays: 0,
            pauses: 0,
            seeks: Vec::new(),
            duration: Some(300.0),
            elapsed: 0.0,
            sessions: 0,
            failing: HashSet::new(),
        }
    }
}

pub struct FakePlayer {
    log: Arc<Mutex<PlayerLog>>,
    events: PlayerEventSender,
}

/// Test-side view of a [`FakePlayer`] owned by the hub
#[derive(Clone)]
pub struct PlayerView {
    log: Arc<Mutex<PlayerLog>>,
    events: PlayerEventSender,
}

impl FakePlayer {
    pub fn new(events: PlayerEventSender) -> (Self, PlayerView) {
        let log = Arc::new(Mutex::new(PlayerLog::default()));
        let view = PlayerView {
            log: log.clone(),
            events: events.clone(),
        };
        (Self { log, events }, view)
    }
}

impl MediaPlayer for FakePlayer {
    type Item = FakeItem;

    fn replace_current(&mut self, id: ItemId, item: FakeItem) {
        let fails = {
            let mut log = self.log.lock().unwrap();
            let fails = log.failing.contains(&item.track_index);
            log.loads.push(item.clone());
            log.current = Some((id, item));
            log.playing = false;
            log.elapsed = 0.0;
            fails
        };
        let event = if fails {
            PlayerEvent::ItemFailed {
                item: id,
                reason: "connection reset".to_string(),
            }
        } else {
            PlayerEvent::ItemReady { item: id }
        };
        self.events.send(event);
    }

    fn clear(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.current = None;
        log.playing = false;
    }

    fn play(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.plays += 1;
        log.playing = true;
    }

    fn pause(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.pauses += 1;
        log.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        let mut log = self.log.lock().unwrap();
        log.volume = volume;
        log.volumes.push(volume);
    }

    fn volume(&self) -> f32 {
        self.log.lock().unwrap().volume
    }

    fn seek(&mut self, position: f64) {
        let mut log = self.log.lock().unwrap();
        log.seeks.push(position);
        log.elapsed = position;
    }

    fn duration(&self) -> Option<f64> {
        self.log.lock().unwrap().duration
    }

    fn elapsed(&self) -> f64 {
        self.log.lock().unwrap().elapsed
    }

    fn activate_session(&mut self) -> Result<(), encore_core::SessionError> {
        self.log.lock().unwrap().sessions += 1;
        Ok(())
    }
}

impl PlayerView {
    pub fn is_playing(&self) -> bool {
        self.log.lock().unwrap().playing
    }

    pub fn volume(&self) -> f32 {
        self.log.lock().unwrap().volume
    }

    pub fn volumes(&self) -> Vec<f32> {
        self.log.lock().unwrap().volumes.clone()
    }

    pub fn plays(&self) -> usize {
        self.log.lock().unwrap().plays
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.log.lock().unwrap().seeks.clone()
    }

    pub fn sessions(&self) -> usize {
        self.log.lock().unwrap().sessions
    }

    /// Track indices in load order
    pub fn loaded_indices(&self) -> Vec<usize> {
        self.log
            .lock()
            .unwrap()
            .loads
            .iter()
            .map(|item| item.track_index)
            .collect()
    }

    pub fn loads(&self) -> Vec<FakeItem> {
        self.log.lock().unwrap().loads.clone()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.log
            .lock()
            .unwrap()
            .current
            .as_ref()
            .map(|(_, item)| item.track_index)
    }

    pub fn set_duration(&self, duration: Option<f64>) {
        self.log.lock().unwrap().duration = duration;
    }

    pub fn fail_track(&self, index: usize) {
        self.log.lock().unwrap().failing.insert(index);
    }

    pub fn heal_track(&self, index: usize) {
        self.log.lock().unwrap().failing.remove(&index);
    }

    /// Report the current item as played to the end
    pub fn finish_current(&self) {
        let current = self.log.lock().unwrap().current.as_ref().map(|(id, _)| *id);
        if let Some(item) = current {
            self.log.lock().unwrap().playing = false;
            self.events.send(PlayerEvent::ItemEnded { item });
        }
    }
}

// ===== History =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryCall {
    Add(ShowId),
    Partial(ShowId),
    Completed(ShowId),
}

/// History sink that records every call
#[derive(Clone, Default)]
pub struct RecordingHistory {
    pub calls: Arc<Mutex<Vec<HistoryCall>>>,
    favorites: Arc<Mutex<HashSet<ShowId>>>,
}

impl RecordingHistory {
    pub fn calls(&self) -> Vec<HistoryCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl HistorySink for RecordingHistory {
    fn add_to_history(&mut self, show: &ShowId) {
        self.calls.lock().unwrap().push(HistoryCall::Add(show.clone()));
    }

    fn mark_partial(&mut self, show: &ShowId) {
        self.calls
            .lock()
            .unwrap()
            .push(HistoryCall::Partial(show.clone()));
    }

    fn mark_completed(&mut self, show: &ShowId) {
        self.calls
            .lock()
            .unwrap()
            .push(HistoryCall::Completed(show.clone()));
    }

    fn toggle_favorite(&mut self, show: &ShowId) -> bool {
        let mut favorites = self.favorites.lock().unwrap();
        if favorites.remove(show) {
            false
        } else {
            favorites.insert(show.clone());
            true
        }
    }

    fn is_favorite(&self, show: &ShowId) -> bool {
        self.favorites.lock().unwrap().contains(show)
    }
}

// ===== Video =====

#[derive(Debug, Default)]
pub struct VideoLog {
    pub playing: bool,
    pub plays: usize,
    pub pauses: usize,
}

#[derive(Clone, Default)]
pub struct FakeVideo {
    pub log: Arc<Mutex<VideoLog>>,
}

impl FakeVideo {
    pub fn is_playing(&self) -> bool {
        self.log.lock().unwrap().playing
    }

    /// Simulate the user pressing play inside the video widget
    pub fn start_externally(&self) {
        self.log.lock().unwrap().playing = true;
    }
}

impl VideoPlayer for FakeVideo {
    fn play(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.plays += 1;
        log.playing = true;
    }

    fn pause(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.pauses += 1;
        log.playing = false;
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.log.lock().unwrap().playing
    }

    fn has_content(&self) -> bool {
        true
    }
}

// ===== Playlists =====

pub fn track_url(show: &str, index: usize) -> Url {
    Url::parse(&format!("https://media.example.test/{show}/t{:02}.mp3", index + 1)).unwrap()
}

pub fn resolved_entry(show: &str, index: usize) -> PlaylistEntry {
    let track = Track::new(index, format!("Track {}", index + 1), format!("t{:02}.mp3", index + 1))
        .with_length_hint("5:00");
    PlaylistEntry::resolved(
        track,
        PlaylistResource {
            track_index: index,
            url: track_url(show, index),
            range_hint: Some(ByteRange::open_ended()),
            is_likely_large_single_file: false,
        },
    )
}

/// `len` resolved tracks
pub fn playlist(show: &str, len: usize) -> Playlist {
    let entries = (0..len).map(|i| resolved_entry(show, i)).collect();
    Playlist::new(ShowId::new(show), entries).with_title(format!("Show {show}"))
}

/// Like [`playlist`], with the entry at `bad` left unresolved
pub fn playlist_with_placeholder(show: &str, len: usize, bad: usize) -> Playlist {
    let mut list = playlist(show, len);
    let track = list.entries[bad].track.clone();
    list.entries[bad] = PlaylistEntry::placeholder(
        track,
        ResolutionError::invalid_resource(bad, "filename is not a single path segment"),
    );
    list
}

// ===== Hub harness =====

/// Short fades keep paused-clock tests readable
pub fn fast_config() -> PlaybackConfig {
    PlaybackConfig {
        fade_duration_ms: 100,
        fade_steps: 4,
        progress_interval_ms: 60_000,
        ..PlaybackConfig::default()
    }
}

pub struct Harness {
    pub handle: HubHandle,
    pub events: broadcast::Receiver<HubEvent>,
    pub dead: PlayerView,
    pub jerry: PlayerView,
    pub backend: Arc<FakeBackend>,
    pub history: RecordingHistory,
    pub video: FakeVideo,
}

impl Harness {
    /// Hub with both catalog engines sharing one backend, plus a video slot
    pub fn start(config: PlaybackConfig) -> Self {
        Self::start_with(config, FakeBackend::new(), None)
    }

    pub fn start_with(
        config: PlaybackConfig,
        backend: FakeBackend,
        network: Option<tokio::sync::watch::Receiver<encore_core::NetworkState>>,
    ) -> Self {
        let backend = Arc::new(backend);
        let history = RecordingHistory::default();
        let video = FakeVideo::default();

        let builder: HubBuilder<FakeBackend, FakePlayer> = HubBuilder::new(config);
        let (dead_player, dead) = FakePlayer::new(builder.player_events(SourceId::Dead));
        let (jerry_player, jerry) = FakePlayer::new(builder.player_events(SourceId::Jerry));

        let mut builder = builder
            .engine(SourceId::Dead, backend.clone(), dead_player)
            .engine(SourceId::Jerry, backend.clone(), jerry_player)
            .video(Box::new(video.clone()))
            .history(Box::new(history.clone()));
        if let Some(network) = network {
            builder = builder.network(network);
        }

        let (hub, handle) = builder.build().unwrap();
        let events = handle.subscribe();
        hub.spawn();

        Self {
            handle,
            events,
            dead,
            jerry,
            backend,
            history,
            video,
        }
    }

    pub fn view(&self, source: SourceId) -> &PlayerView {
        match source {
            SourceId::Jerry => &self.jerry,
            _ => &self.dead,
        }
    }

    /// Everything published since the last drain
    pub fn drain_events(&mut self) -> Vec<HubEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

/// Let the hub and its timers run for `ms` of (paused) time
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
