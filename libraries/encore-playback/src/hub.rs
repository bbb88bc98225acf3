//! Playback hub: composition root and control loop
//!
//! The hub owns one engine per catalog source, the video slot, the
//! coordinator, the history sink and the catalogs. It is the only place
//! state changes: a single task selects over
//! - commands from [`HubHandle`]s
//! - engine completions (fade steps, retry timers, preloads)
//! - player lifecycle events
//! - resolved shows
//! - network changes
//! - the progress ticker
//!
//! After every message it drains the engines' outboxes, feeds history
//! marks to the sink and start requests to the coordinator, lets the
//! coordinator reconcile, and republishes events and now-playing.

use crate::backend::{MediaBackend, MediaPlayer, PlayerEvent, PlayerEventSender};
use crate::config::PlaybackConfig;
use crate::coordinator::{Pausable, PlaybackCoordinator, StartDecision};
use crate::engine::PlaybackEngine;
use crate::error::{PlaybackError, Result};
use crate::events::{EngineEvent, HistoryMark, HubEvent};
use crate::history::HistoryBook;
use crate::mailbox::{EngineMessage, Envelope, Mailbox};
use crate::remote::{NowPlaying, RemoteCommand};
use crate::video::{VideoCommand, VideoPlayer, VideoSlot};
use encore_catalog::{CatalogError, ShowCatalog};
use encore_core::{HistorySink, MemoryStore, NetworkState, Playlist, ShowId, SourceId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

const COMMAND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;
/// Outbox drain / reconcile passes per dispatch
const MAX_SETTLE_ROUNDS: usize = 8;

/// Commands accepted by the hub
#[derive(Debug)]
pub enum HubCommand {
    /// Resolve a show through the source's catalog, then play it
    PlayShow {
        source: SourceId,
        show: ShowId,
        start_index: usize,
    },

    /// Load an already resolved playlist
    LoadPlaylist {
        source: SourceId,
        playlist: Playlist,
        start_index: usize,
        autoplay: bool,
    },

    Play(SourceId),
    Pause(SourceId),
    TogglePlayPause(SourceId),
    PlayTrack { source: SourceId, index: usize },
    Next(SourceId),
    Previous(SourceId),
    /// Absolute position in seconds
    Seek { source: SourceId, position: f64 },
    /// Manual retry of a failed track
    Retry(SourceId),
    Stop(SourceId),
    PauseActive,
    Remote(RemoteCommand),
    Video(VideoCommand),
    ToggleFavorite(ShowId),
    Shutdown,
}

/// Cloneable handle for talking to a running hub
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    events: broadcast::Sender<HubEvent>,
    now_playing: watch::Receiver<NowPlaying>,
    active: watch::Receiver<Option<SourceId>>,
}

impl HubHandle {
    pub async fn send(&self, command: HubCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::HubClosed)
    }

    /// Send without waiting for queue space
    pub fn try_send(&self, command: HubCommand) -> Result<()> {
        self.commands
            .try_send(command)
            .map_err(|_| PlaybackError::HubClosed)
    }

    pub async fn play_show(&self, source: SourceId, show: ShowId, start_index: usize) -> Result<()> {
        self.send(HubCommand::PlayShow {
            source,
            show,
            start_index,
        })
        .await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(HubCommand::Shutdown).await
    }

    /// Receive hub events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.events.subscribe()
    }

    pub fn now_playing(&self) -> NowPlaying {
        self.now_playing.borrow().clone()
    }

    pub fn watch_now_playing(&self) -> watch::Receiver<NowPlaying> {
        self.now_playing.clone()
    }

    pub fn active_source(&self) -> Option<SourceId> {
        *self.active.borrow()
    }

    pub fn watch_active_source(&self) -> watch::Receiver<Option<SourceId>> {
        self.active.clone()
    }
}

/// Builder wiring engines, players and collaborators into a hub
pub struct HubBuilder<B, P>
where
    B: MediaBackend,
    P: MediaPlayer<Item = B::Item>,
{
    config: PlaybackConfig,
    engines: Vec<(SourceId, Arc<B>, P)>,
    video: VideoSlot,
    catalogs: HashMap<SourceId, Arc<dyn ShowCatalog>>,
    history: Option<Box<dyn HistorySink>>,
    network: Option<watch::Receiver<NetworkState>>,
    player_tx: mpsc::UnboundedSender<(SourceId, PlayerEvent)>,
    player_rx: mpsc::UnboundedReceiver<(SourceId, PlayerEvent)>,
}

impl<B, P> HubBuilder<B, P>
where
    B: MediaBackend,
    P: MediaPlayer<Item = B::Item>,
{
    pub fn new(config: PlaybackConfig) -> Self {
        let (player_tx, player_rx) = mpsc::unbounded_channel();
        Self {
            config,
            engines: Vec::new(),
            video: VideoSlot::empty(),
            catalogs: HashMap::new(),
            history: None,
            network: None,
            player_tx,
            player_rx,
        }
    }

    /// Event sender to hand to the player built for `source`
    pub fn player_events(&self, source: SourceId) -> PlayerEventSender {
        PlayerEventSender::new(source, self.player_tx.clone())
    }

    #[must_use]
    pub fn engine(mut self, source: SourceId, backend: Arc<B>, player: P) -> Self {
        self.engines.push((source, backend, player));
        self
    }

    #[must_use]
    pub fn video(mut self, player: Box<dyn VideoPlayer>) -> Self {
        self.video = VideoSlot::new(player);
        self
    }

    #[must_use]
    pub fn catalog(mut self, source: SourceId, catalog: Arc<dyn ShowCatalog>) -> Self {
        self.catalogs.insert(source, catalog);
        self
    }

    /// Defaults to an in-memory history book
    #[must_use]
    pub fn history(mut self, sink: Box<dyn HistorySink>) -> Self {
        self.history = Some(sink);
        self
    }

    /// Defaults to a fixed usable network
    #[must_use]
    pub fn network(mut self, network: watch::Receiver<NetworkState>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn build(self) -> Result<(PlaybackHub<B, P>, HubHandle)> {
        self.config.validate()?;

        let network = self
            .network
            .unwrap_or_else(|| watch::channel(NetworkState::default()).1);
        let (engine_tx, engine_rx) = mpsc::unbounded_channel();

        let mut engines = BTreeMap::new();
        for (source, backend, player) in self.engines {
            if !source.is_catalog() {
                return Err(PlaybackError::UnknownSource(source));
            }
            if engines.contains_key(&source) {
                return Err(PlaybackError::invalid_config(format!(
                    "engine for {source} registered twice"
                )));
            }
            let engine = PlaybackEngine::new(
                source,
                self.config.clone(),
                backend,
                player,
                Mailbox::new(source, engine_tx.clone()),
                network.clone(),
            );
            engines.insert(source, engine);
        }

        let history = self.history.unwrap_or_else(|| {
            Box::new(HistoryBook::load(MemoryStore::new(), self.config.history_size))
        });

        let coordinator = PlaybackCoordinator::new();
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (now_playing_tx, now_playing_rx) = watch::channel(NowPlaying::idle());
        let (resolved_tx, resolved_rx) = mpsc::unbounded_channel();

        let handle = HubHandle {
            commands: commands_tx,
            events: events_tx.clone(),
            now_playing: now_playing_rx,
            active: coordinator.subscribe(),
        };

        let last_network = *network.borrow();
        let hub = PlaybackHub {
            config: self.config,
            engines,
            video: self.video,
            coordinator,
            history,
            catalogs: self.catalogs,
            network,
            last_network,
            last_active: None,
            commands: commands_rx,
            engine_rx,
            player_rx: self.player_rx,
            resolved_tx,
            resolved_rx,
            show_tickets: HashMap::new(),
            events: events_tx,
            now_playing: now_playing_tx,
        };
        Ok((hub, handle))
    }
}

/// Outcome of a background catalog lookup
struct ResolvedShow {
    source: SourceId,
    show: ShowId,
    start_index: usize,
    ticket: u64,
    result: std::result::Result<Playlist, CatalogError>,
}

/// The playback control loop
pub struct PlaybackHub<B, P>
where
    B: MediaBackend,
    P: MediaPlayer<Item = B::Item>,
{
    config: PlaybackConfig,
    engines: BTreeMap<SourceId, PlaybackEngine<B, P>>,
    video: VideoSlot,
    coordinator: PlaybackCoordinator,
    history: Box<dyn HistorySink>,
    catalogs: HashMap<SourceId, Arc<dyn ShowCatalog>>,
    network: watch::Receiver<NetworkState>,
    last_network: NetworkState,
    last_active: Option<SourceId>,
    commands: mpsc::Receiver<HubCommand>,
    engine_rx: mpsc::UnboundedReceiver<Envelope<B::Item>>,
    player_rx: mpsc::UnboundedReceiver<(SourceId, PlayerEvent)>,
    resolved_tx: mpsc::UnboundedSender<ResolvedShow>,
    resolved_rx: mpsc::UnboundedReceiver<ResolvedShow>,
    /// Latest show request per source; older resolutions are dropped
    show_tickets: HashMap<SourceId, u64>,
    events: broadcast::Sender<HubEvent>,
    now_playing: watch::Sender<NowPlaying>,
}

/// Borrow every source as a `Pausable`, engines first, video last
fn pausables<'a, B, P>(
    engines: &'a mut BTreeMap<SourceId, PlaybackEngine<B, P>>,
    video: &'a mut VideoSlot,
) -> Vec<&'a mut dyn Pausable>
where
    B: MediaBackend,
    P: MediaPlayer<Item = B::Item>,
{
    let mut sources: Vec<&'a mut dyn Pausable> = engines
        .values_mut()
        .map(|engine| engine as &mut dyn Pausable)
        .collect();
    sources.push(video);
    sources
}

impl<B, P> PlaybackHub<B, P>
where
    B: MediaBackend,
    P: MediaPlayer<Item = B::Item>,
{
    pub fn builder(config: PlaybackConfig) -> HubBuilder<B, P> {
        HubBuilder::new(config)
    }

    pub fn engine(&self, source: SourceId) -> Option<&PlaybackEngine<B, P>> {
        self.engines.get(&source)
    }

    pub fn active_source(&self) -> Option<SourceId> {
        self.coordinator.active()
    }

    /// Run the control loop on a new task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until `Shutdown` or until every handle is dropped
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.progress_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut network_open = true;

        info!(
            engines = ?self.engines.keys().collect::<Vec<_>>(),
            video = self.video.is_present(),
            "Playback hub started"
        );
        self.settle();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(HubCommand::Shutdown) | None => break,
                    Some(command) => self.dispatch(command),
                },
                Some((source, message)) = self.engine_rx.recv() => {
                    self.on_engine_message(source, message);
                }
                Some((source, event)) = self.player_rx.recv() => {
                    self.on_player_event(source, event);
                }
                Some(resolved) = self.resolved_rx.recv() => {
                    self.on_show_resolved(resolved);
                }
                changed = self.network.changed(), if network_open => {
                    if changed.is_ok() {
                        self.on_network_changed();
                    } else {
                        debug!("Network monitor gone, keeping last state");
                        network_open = false;
                    }
                }
                _ = ticker.tick() => self.on_tick(),
            }
            self.settle();
        }

        self.shutdown();
    }

    fn engine_mut(&mut self, source: SourceId) -> Result<&mut PlaybackEngine<B, P>> {
        self.engines
            .get_mut(&source)
            .ok_or(PlaybackError::UnknownSource(source))
    }

    fn publish(&self, event: HubEvent) {
        if self.events.send(event).is_err() {
            trace!("No hub event subscribers");
        }
    }

    // ===== Commands =====

    fn dispatch(&mut self, command: HubCommand) {
        debug!(?command, "Hub command");

        let result = match command {
            HubCommand::PlayShow {
                source,
                show,
                start_index,
            } => self.request_show(source, show, start_index),
            HubCommand::LoadPlaylist {
                source,
                playlist,
                start_index,
                autoplay,
            } => {
                self.bump_ticket(source);
                self.engine_mut(source)
                    .and_then(|e| e.load_show(playlist, start_index, autoplay))
            }
            HubCommand::Play(source) => self.play(source),
            HubCommand::Pause(source) => self.pause(source),
            HubCommand::TogglePlayPause(source) => self.toggle(source),
            HubCommand::PlayTrack { source, index } => {
                self.engine_mut(source).and_then(|e| e.play_track(index))
            }
            HubCommand::Next(source) => self.engine_mut(source).and_then(|e| e.next()),
            HubCommand::Previous(source) => self.engine_mut(source).and_then(|e| e.previous()),
            HubCommand::Seek { source, position } => {
                self.engine_mut(source).and_then(|e| e.seek(position))
            }
            HubCommand::Retry(source) => self.engine_mut(source).and_then(|e| e.retry()),
            HubCommand::Stop(SourceId::Youtube) => {
                self.video_command(VideoCommand::Stop);
                Ok(())
            }
            HubCommand::Stop(source) => {
                self.coordinator.cancel_start(source);
                self.engine_mut(source).map(|e| e.stop())
            }
            HubCommand::PauseActive => {
                let mut sources = pausables(&mut self.engines, &mut self.video);
                self.coordinator.pause_active(&mut sources);
                Ok(())
            }
            HubCommand::Remote(remote) => self.remote(remote),
            HubCommand::Video(video) => {
                self.video_command(video);
                Ok(())
            }
            HubCommand::ToggleFavorite(show) => {
                let favorite = self.history.toggle_favorite(&show);
                self.publish(HubEvent::FavoriteChanged { show, favorite });
                Ok(())
            }
            HubCommand::Shutdown => Ok(()),
        };

        match result {
            Ok(()) => {}
            Err(PlaybackError::Seek(err)) => debug!(error = %err, "Seek ignored"),
            Err(err) => warn!(error = %err, "Hub command failed"),
        }
    }

    fn bump_ticket(&mut self, source: SourceId) -> u64 {
        let ticket = self.show_tickets.entry(source).or_insert(0);
        *ticket += 1;
        *ticket
    }

    fn request_show(&mut self, source: SourceId, show: ShowId, start_index: usize) -> Result<()> {
        if !self.engines.contains_key(&source) {
            return Err(PlaybackError::UnknownSource(source));
        }
        let Some(catalog) = self.catalogs.get(&source).cloned() else {
            self.publish(HubEvent::ShowLoadFailed {
                source,
                show,
                error: format!("no catalog configured for {source}"),
            });
            return Ok(());
        };

        let ticket = self.bump_ticket(source);
        let tx = self.resolved_tx.clone();
        info!(source = %source, show = %show, start_index, "Resolving show");
        tokio::spawn(async move {
            let result = catalog.resolve(&show, start_index).await;
            let resolved = ResolvedShow {
                source,
                show,
                start_index,
                ticket,
                result,
            };
            if tx.send(resolved).is_err() {
                trace!("Hub gone before show resolved");
            }
        });
        Ok(())
    }

    fn on_show_resolved(&mut self, resolved: ResolvedShow) {
        let ResolvedShow {
            source,
            show,
            start_index,
            ticket,
            result,
        } = resolved;

        if self.show_tickets.get(&source) != Some(&ticket) {
            debug!(source = %source, show = %show, "Dropping superseded show");
            return;
        }

        match result {
            Ok(playlist) => {
                let loaded = self
                    .engine_mut(source)
                    .and_then(|e| e.load_show(playlist, start_index, true));
                if let Err(err) = loaded {
                    warn!(source = %source, show = %show, error = %err, "Resolved show could not be loaded");
                    self.publish(HubEvent::ShowLoadFailed {
                        source,
                        show,
                        error: err.to_string(),
                    });
                }
            }
            Err(err) => {
                warn!(source = %source, show = %show, error = %err, "Show resolution failed");
                self.publish(HubEvent::ShowLoadFailed {
                    source,
                    show,
                    error: err.to_string(),
                });
            }
        }
    }

    fn play(&mut self, source: SourceId) -> Result<()> {
        if source == SourceId::Youtube {
            self.video_command(VideoCommand::Play);
            return Ok(());
        }
        self.engine_mut(source)?.play()
    }

    fn pause(&mut self, source: SourceId) -> Result<()> {
        if source == SourceId::Youtube {
            self.video_command(VideoCommand::Pause);
            return Ok(());
        }
        self.coordinator.cancel_start(source);
        self.engine_mut(source)?.pause();
        Ok(())
    }

    fn toggle(&mut self, source: SourceId) -> Result<()> {
        let audible = if source == SourceId::Youtube {
            self.video.is_playing()
        } else {
            let engine = self.engine_mut(source)?;
            engine.is_playing() && !engine.is_fading_out()
        };
        if audible {
            self.pause(source)
        } else {
            self.play(source)
        }
    }

    fn remote(&mut self, command: RemoteCommand) -> Result<()> {
        let Some(active) = self.coordinator.active() else {
            debug!(?command, "Remote command with no active source");
            return Ok(());
        };

        match (active, command) {
            (_, RemoteCommand::Play) => self.play(active),
            (_, RemoteCommand::Pause) => self.pause(active),
            (_, RemoteCommand::TogglePlayPause) => self.toggle(active),
            (SourceId::Youtube, _) => {
                debug!(?command, "Video ignores track navigation");
                Ok(())
            }
            (_, RemoteCommand::Next) => self.engine_mut(active)?.next(),
            (_, RemoteCommand::Previous) => self.engine_mut(active)?.previous(),
            (_, RemoteCommand::Seek(position)) => self.engine_mut(active)?.seek(position),
        }
    }

    fn video_command(&mut self, command: VideoCommand) {
        match command {
            VideoCommand::Play => {
                if !self.video.is_present() {
                    warn!("No video player configured");
                    return;
                }
                let decision = {
                    let mut sources = pausables(&mut self.engines, &mut self.video);
                    self.coordinator
                        .request_start(SourceId::Youtube, &mut sources)
                };
                if decision == StartDecision::Granted {
                    self.video.play();
                }
            }
            VideoCommand::Pause => {
                self.coordinator.cancel_start(SourceId::Youtube);
                Pausable::pause(&mut self.video);
            }
            VideoCommand::Stop => {
                self.coordinator.cancel_start(SourceId::Youtube);
                self.video.stop();
            }
            VideoCommand::Started => {
                let mut sources = pausables(&mut self.engines, &mut self.video);
                self.coordinator
                    .set_active(SourceId::Youtube, &mut sources);
            }
        }
    }

    // ===== Inbound events =====

    fn on_engine_message(&mut self, source: SourceId, message: EngineMessage<B::Item>) {
        match self.engines.get_mut(&source) {
            Some(engine) => engine.handle_message(message),
            None => trace!(source = %source, "Message for unknown engine"),
        }
    }

    fn on_player_event(&mut self, source: SourceId, event: PlayerEvent) {
        match self.engines.get_mut(&source) {
            Some(engine) => engine.handle_player_event(event),
            None => trace!(source = %source, "Player event for unknown engine"),
        }
    }

    fn on_network_changed(&mut self) {
        let state = *self.network.borrow_and_update();
        let previous = self.last_network;
        self.last_network = state;
        if state == previous {
            return;
        }
        self.publish(HubEvent::NetworkChanged { state });

        if !state.available {
            return;
        }
        let regained = !previous.available;
        for engine in self.engines.values_mut() {
            if regained && self.config.retry_on_reconnect {
                engine.on_network_regained();
            } else {
                engine.refresh_lookahead();
            }
        }
    }

    fn on_tick(&mut self) {
        for engine in self.engines.values_mut() {
            if engine.is_playing() {
                engine.sample_progress();
            }
        }
    }

    // ===== Settling =====

    fn settle(&mut self) {
        let mut settled = false;
        for _ in 0..MAX_SETTLE_ROUNDS {
            let mut progressed = false;

            let drained: Vec<(SourceId, EngineEvent)> = self
                .engines
                .iter_mut()
                .flat_map(|(&source, engine)| {
                    engine
                        .drain_events()
                        .into_iter()
                        .map(move |event| (source, event))
                })
                .collect();
            if !drained.is_empty() {
                progressed = true;
                for (source, event) in drained {
                    self.apply(source, event);
                }
            }

            let start = {
                let mut sources = pausables(&mut self.engines, &mut self.video);
                self.coordinator.reconcile(&mut sources)
            };
            if let Some(source) = start {
                debug!(source = %source, "Starting deferred source");
                self.start_source(source);
                progressed = true;
            }

            if !progressed {
                settled = true;
                break;
            }
        }
        if !settled {
            debug!(
                rounds = MAX_SETTLE_ROUNDS,
                "Settle cap reached, remaining events wait for the next message"
            );
        }

        let active = self.coordinator.active();
        if active != self.last_active {
            self.last_active = active;
            self.publish(HubEvent::ActiveSourceChanged { active });
        }
        self.publish_now_playing();
    }

    fn apply(&mut self, source: SourceId, event: EngineEvent) {
        match event {
            EngineEvent::StartRequested => {
                let decision = {
                    let mut sources = pausables(&mut self.engines, &mut self.video);
                    self.coordinator.request_start(source, &mut sources)
                };
                if decision == StartDecision::Granted {
                    self.start_source(source);
                }
            }
            EngineEvent::History(mark) => match mark {
                HistoryMark::AddToHistory(show) => self.history.add_to_history(&show),
                HistoryMark::Partial(show) => self.history.mark_partial(&show),
                HistoryMark::Completed(show) => self.history.mark_completed(&show),
            },
            other => {
                if let Some(event) = other.into_hub_event(source) {
                    self.publish(event);
                }
            }
        }
    }

    fn start_source(&mut self, source: SourceId) {
        if source == SourceId::Youtube {
            self.video.play();
        } else if let Some(engine) = self.engines.get_mut(&source) {
            engine.start_granted();
        }
    }

    fn publish_now_playing(&mut self) {
        let now = match self.coordinator.active() {
            Some(SourceId::Youtube) => NowPlaying {
                source: Some(SourceId::Youtube),
                is_playing: self.video.is_playing(),
                ..NowPlaying::idle()
            },
            Some(source) => self
                .engines
                .get(&source)
                .map(|e| e.now_playing())
                .unwrap_or_default(),
            None => NowPlaying::idle(),
        };
        self.now_playing.send_if_modified(|current| {
            if *current == now {
                false
            } else {
                *current = now;
                true
            }
        });
    }

    fn shutdown(&mut self) {
        for engine in self.engines.values_mut() {
            engine.stop();
        }
        self.video.stop();
        info!("Playback hub stopped");
    }
}
