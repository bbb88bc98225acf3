//! Per-source playback engine
//!
//! Drives one [`MediaPlayer`] through the track state machine:
//!
//! ```text
//! idle --load--> loading --ready--> ready --play--> playing --pause--> paused
//! loading --failure--> failed --retry--> loading
//! failed --attempts exhausted--> failed (terminal for this track)
//! playing --ended--> loading (next track) | completed (last track)
//! ```
//!
//! The engine is synchronous. Everything that takes time (fade steps,
//! retry backoff, preloads, item readiness) comes back in as an
//! [`EngineMessage`] or a [`PlayerEvent`], and everything the outside world
//! must act on (history, coordination, UI) goes out through the outbox
//! drained with [`PlaybackEngine::drain_events`].
//!
//! Starting audio is a two-step handshake: `play` only emits
//! [`EngineEvent::StartRequested`]; the control loop asks the coordinator
//! and calls [`PlaybackEngine::start_granted`] when this source may be heard.

use crate::backend::{ItemId, MediaBackend, MediaPlayer, PlayerEvent};
use crate::buffer::{BufferPolicy, PlayableItem, TrackBuffer};
use crate::config::PlaybackConfig;
use crate::coordinator::Pausable;
use crate::error::{PlaybackError, Result, TrackFailure};
use crate::events::{EngineEvent, HistoryMark};
use crate::mailbox::{EngineMessage, Mailbox};
use crate::ramp::{FadeDirection, VolumeRamp};
use crate::remote::NowPlaying;
use crate::retry::{RetryDecision, RetryState};
use encore_core::{
    LoadError, NetworkState, PlaybackState, Playlist, PlaylistResource, ResolutionError,
    SeekError, SourceId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Show currently loaded on an engine
struct LoadedShow {
    playlist: Playlist,
    /// Audible playback has started at least once since the load
    history_started: bool,
    /// Last track ended; sticky until the next load
    completed: bool,
}

struct CurrentTrack {
    index: usize,
    /// Item handed to the player; `None` while nothing valid is loaded
    item: Option<ItemId>,
}

struct PendingRetry {
    ticket: u64,
    token: CancellationToken,
}

struct ActiveFade {
    id: u64,
    direction: FadeDirection,
    ramp: VolumeRamp,
    token: CancellationToken,
}

/// Playback state machine for one content source
pub struct PlaybackEngine<B, P>
where
    B: MediaBackend,
    P: MediaPlayer<Item = B::Item>,
{
    source: SourceId,
    config: PlaybackConfig,
    player: P,
    buffer: TrackBuffer<B>,
    mailbox: Mailbox<B::Item>,
    state: PlaybackState,
    show: Option<LoadedShow>,
    current: Option<CurrentTrack>,
    retry: RetryState,
    pending_retry: Option<PendingRetry>,
    next_ticket: u64,
    fade: Option<ActiveFade>,
    next_fade_id: u64,
    /// Start audio as soon as the current item is ready
    autoplay: bool,
    /// Current track failed for good
    terminal: bool,
    outbox: Vec<EngineEvent>,
}

impl<B, P> PlaybackEngine<B, P>
where
    B: MediaBackend,
    P: MediaPlayer<Item = B::Item>,
{
    pub fn new(
        source: SourceId,
        config: PlaybackConfig,
        backend: Arc<B>,
        player: P,
        mailbox: Mailbox<B::Item>,
        network: watch::Receiver<NetworkState>,
    ) -> Self {
        let buffer = TrackBuffer::new(backend, network, BufferPolicy::from_config(&config));
        let retry = RetryState::new(
            config.max_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
        );
        Self {
            source,
            config,
            player,
            buffer,
            mailbox,
            state: PlaybackState::Idle,
            show: None,
            current: None,
            retry,
            pending_retry: None,
            next_ticket: 0,
            fade: None,
            next_fade_id: 0,
            autoplay: false,
            terminal: false,
            outbox: Vec::new(),
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current.as_ref().map(|c| c.index)
    }

    pub fn playlist(&self) -> Option<&Playlist> {
        self.show.as_ref().map(|s| &s.playlist)
    }

    pub fn is_show_completed(&self) -> bool {
        self.show.as_ref().is_some_and(|s| s.completed)
    }

    pub fn buffer(&self) -> &TrackBuffer<B> {
        &self.buffer
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn retry_attempt(&self) -> u32 {
        self.retry.attempt()
    }

    pub fn is_terminal_failure(&self) -> bool {
        self.state == PlaybackState::Failed && self.terminal
    }

    pub fn is_fading_out(&self) -> bool {
        self.fade
            .as_ref()
            .is_some_and(|f| f.direction == FadeDirection::Out)
    }

    /// Take everything emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn emit(&mut self, event: EngineEvent) {
        self.outbox.push(event);
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!(source = %self.source, from = %self.state, to = %state, "State change");
            self.state = state;
            self.emit(EngineEvent::StateChanged { state });
        }
    }

    // ===== Show and track selection =====

    /// Replace the loaded show and select `start_index`
    ///
    /// Everything belonging to the previous show (buffer, pending retry,
    /// fades, history progress) is discarded.
    pub fn load_show(&mut self, playlist: Playlist, start_index: usize, autoplay: bool) -> Result<()> {
        if start_index >= playlist.len() {
            return Err(PlaybackError::IndexOutOfBounds(start_index));
        }

        info!(
            source = %self.source,
            show = %playlist.show_id,
            tracks = playlist.len(),
            start_index,
            "Loading show"
        );

        self.cancel_fade();
        self.cancel_retry();
        self.buffer.invalidate_all();
        self.show = Some(LoadedShow {
            playlist,
            history_started: false,
            completed: false,
        });
        self.switch_to(start_index, autoplay);
        Ok(())
    }

    /// Select and start a track of the loaded show
    pub fn play_track(&mut self, index: usize) -> Result<()> {
        let len = self
            .show
            .as_ref()
            .ok_or(PlaybackError::NoShowLoaded)?
            .playlist
            .len();
        if index >= len {
            return Err(PlaybackError::IndexOutOfBounds(index));
        }
        self.switch_to(index, true);
        Ok(())
    }

    /// Next track; no-op on the last one
    pub fn next(&mut self) -> Result<()> {
        let (index, last) = self.position()?;
        if index >= last {
            debug!(source = %self.source, index, "Already on the last track");
            return Ok(());
        }
        self.switch_to(index + 1, self.autoplay);
        Ok(())
    }

    /// Previous track; no-op on the first one
    pub fn previous(&mut self) -> Result<()> {
        let (index, _) = self.position()?;
        if index == 0 {
            debug!(source = %self.source, "Already on the first track");
            return Ok(());
        }
        self.switch_to(index - 1, self.autoplay);
        Ok(())
    }

    fn position(&self) -> Result<(usize, usize)> {
        let show = self.show.as_ref().ok_or(PlaybackError::NoShowLoaded)?;
        let current = self.current.as_ref().ok_or(PlaybackError::NoShowLoaded)?;
        let last = show.playlist.last_index().unwrap_or(0);
        Ok((current.index, last))
    }

    fn entry_resource(
        &self,
        index: usize,
    ) -> Option<std::result::Result<PlaylistResource, ResolutionError>> {
        let show = self.show.as_ref()?;
        show.playlist.entry(index).map(|e| e.resource.clone())
    }

    /// Make `index` the current track
    ///
    /// Supersedes whatever the previous selection had in flight: its
    /// retry timer is cancelled, its fade is cancelled and late events for
    /// its item no longer match.
    fn switch_to(&mut self, index: usize, autoplay: bool) {
        let Some(show) = self.show.as_ref() else {
            return;
        };
        let Some(entry) = show.playlist.entry(index) else {
            return;
        };
        let show_id = show.playlist.show_id.clone();
        let mark_partial = show.history_started && !show.completed;
        let title = entry.track.title.clone();
        let resource = entry.resource.clone();

        self.cancel_retry();
        self.cancel_fade();
        self.retry.reset();
        self.terminal = false;
        self.autoplay = autoplay;
        if !autoplay {
            self.player.pause();
            self.player.set_volume(0.0);
        }

        if mark_partial {
            self.emit(EngineEvent::History(HistoryMark::Partial(show_id)));
        }

        self.current = Some(CurrentTrack { index, item: None });
        self.emit(EngineEvent::TrackChanged { index, title });

        match resource {
            Ok(resource) => {
                let playable = match self.buffer.consume(index) {
                    Some(playable) => playable,
                    None => self.buffer.load_current(&resource),
                };
                self.buffer
                    .retain_window(index, self.config.preload_limit);
                self.install(playable);
            }
            Err(err) => {
                self.buffer
                    .retain_window(index, self.config.preload_limit);
                self.player.clear();
                warn!(source = %self.source, index, error = %err, "Reached an unresolvable track");
                self.fail_terminal(index, TrackFailure::Unresolved(err));
            }
        }
    }

    fn install(&mut self, playable: PlayableItem<B::Item>) {
        if let Some(current) = self.current.as_mut() {
            current.item = Some(playable.item_id);
        }
        trace!(
            source = %self.source,
            index = playable.track_index,
            item = %playable.item_id,
            "Replacing current item"
        );
        self.player
            .replace_current(playable.item_id, playable.item);
        self.set_state(PlaybackState::Loading);
    }

    /// Reload the current track from its resource, bypassing the buffer
    fn reload_current(&mut self, index: usize) {
        match self.entry_resource(index) {
            Some(Ok(resource)) => {
                let playable = self.buffer.load_current(&resource);
                self.install(playable);
            }
            Some(Err(err)) => self.fail_terminal(index, TrackFailure::Unresolved(err)),
            None => {}
        }
    }

    fn fail_terminal(&mut self, index: usize, failure: TrackFailure) {
        self.cancel_retry();
        self.cancel_fade();
        self.terminal = true;
        if let Some(current) = self.current.as_mut() {
            current.item = None;
        }
        self.set_state(PlaybackState::Failed);
        self.emit(EngineEvent::TrackFailed {
            index,
            error: failure,
            terminal: true,
        });
    }

    // ===== Transport =====

    /// Ask to become audible
    ///
    /// No-op while already playing. When the current item is still loading
    /// or waiting for a retry, playback starts once it is ready.
    pub fn play(&mut self) -> Result<()> {
        if self.show.is_none() || self.current.is_none() {
            return Err(PlaybackError::NoShowLoaded);
        }

        match self.state {
            PlaybackState::Playing if !self.is_fading_out() => {}
            PlaybackState::Ready | PlaybackState::Paused | PlaybackState::Playing => {
                self.autoplay = true;
                self.emit(EngineEvent::StartRequested);
            }
            PlaybackState::Loading => self.autoplay = true,
            PlaybackState::Failed => {
                self.autoplay = true;
                if self.terminal {
                    debug!(source = %self.source, "Track failed for good, waiting for a retry");
                }
            }
            PlaybackState::Completed | PlaybackState::Idle => {
                debug!(source = %self.source, state = %self.state, "Nothing to play");
            }
        }
        Ok(())
    }

    /// The coordinator allowed this source to be heard
    ///
    /// Activates the audio session and ramps up: from silence on a fresh
    /// start, from the current level when interrupting a fade-out. Ignored
    /// when the source was paused while it waited for the grant.
    pub fn start_granted(&mut self) {
        if !self.autoplay {
            debug!(source = %self.source, "Start granted after a pause, staying silent");
            return;
        }
        match self.state {
            PlaybackState::Ready | PlaybackState::Paused => {}
            PlaybackState::Playing if self.is_fading_out() => {}
            _ => {
                trace!(source = %self.source, state = %self.state, "Start granted but nothing to start");
                return;
            }
        }

        if let Err(err) = self.player.activate_session() {
            warn!(source = %self.source, error = %err, "Audio session activation failed, playing anyway");
        }

        let from = match self.fade.take() {
            Some(fade) => {
                fade.token.cancel();
                self.player.volume()
            }
            None => {
                self.player.set_volume(0.0);
                0.0
            }
        };

        self.autoplay = true;
        self.player.play();
        self.set_state(PlaybackState::Playing);
        self.mark_started();
        self.start_fade(FadeDirection::In, from, self.config.target_volume);
    }

    fn mark_started(&mut self) {
        let Some(show) = self.show.as_mut() else {
            return;
        };
        if show.history_started {
            return;
        }
        show.history_started = true;
        let show_id = show.playlist.show_id.clone();
        let completed = show.completed;

        self.emit(EngineEvent::History(HistoryMark::AddToHistory(show_id.clone())));
        if !completed {
            self.emit(EngineEvent::History(HistoryMark::Partial(show_id)));
        }
    }

    /// Fade out, then pause
    ///
    /// The engine keeps reporting `playing` until the last fade step has
    /// paused the player.
    pub fn pause(&mut self) {
        self.autoplay = false;
        if self.state != PlaybackState::Playing || self.is_fading_out() {
            return;
        }
        let from = self.player.volume();
        self.start_fade(FadeDirection::Out, from, 0.0);
    }

    /// Pause without fading
    pub fn force_pause(&mut self) {
        self.autoplay = false;
        self.cancel_fade();
        if self.state == PlaybackState::Playing {
            warn!(source = %self.source, "Force pausing");
            self.player.pause();
            self.player.set_volume(0.0);
            self.set_state(PlaybackState::Paused);
        }
    }

    /// Unload the current track, keeping the show
    pub fn stop(&mut self) {
        self.cancel_fade();
        self.cancel_retry();
        self.buffer.invalidate_all();
        self.player.pause();
        self.player.clear();
        self.autoplay = false;
        self.terminal = false;
        self.current = None;
        self.set_state(PlaybackState::Idle);
    }

    /// Manual retry of a failed track, with a fresh attempt budget
    pub fn retry(&mut self) -> Result<()> {
        let index = self.current_index().ok_or(PlaybackError::NoShowLoaded)?;
        if self.state != PlaybackState::Failed {
            debug!(source = %self.source, state = %self.state, "Nothing to retry");
            return Ok(());
        }

        info!(source = %self.source, index, "Retrying track");
        self.cancel_retry();
        self.retry.reset();
        self.terminal = false;
        self.reload_current(index);
        Ok(())
    }

    /// Seek the current track, in seconds
    pub fn seek(&mut self, position: f64) -> Result<()> {
        let index = self.current_index().ok_or(PlaybackError::NoShowLoaded)?;
        let duration = self
            .player
            .duration()
            .filter(|d| d.is_finite())
            .ok_or(SeekError::NonFinite)?;
        if !position.is_finite() {
            return Err(SeekError::NonFinite.into());
        }

        let target = position.clamp(0.0, duration);
        self.player.seek(target);
        self.emit(EngineEvent::Progress {
            index,
            elapsed: target,
            duration: Some(duration),
        });
        Ok(())
    }

    /// Emit a progress sample for the current track
    pub fn sample_progress(&mut self) {
        let Some(index) = self.current_index() else {
            return;
        };
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            let elapsed = self.player.elapsed();
            let duration = self.known_duration(index);
            self.emit(EngineEvent::Progress {
                index,
                elapsed,
                duration,
            });
        }
    }

    /// Player duration, falling back to the catalog length hint
    fn known_duration(&self, index: usize) -> Option<f64> {
        self.player
            .duration()
            .filter(|d| d.is_finite())
            .or_else(|| {
                let show = self.show.as_ref()?;
                let track = &show.playlist.entry(index)?.track;
                track.length_hint_duration().map(|d| d.as_secs_f64())
            })
    }

    pub fn now_playing(&self) -> NowPlaying {
        let Some(index) = self.current_index() else {
            return NowPlaying {
                source: Some(self.source),
                ..NowPlaying::idle()
            };
        };
        let show = self.show.as_ref();
        NowPlaying {
            source: Some(self.source),
            title: show
                .and_then(|s| s.playlist.entry(index))
                .map(|e| e.track.title.clone()),
            show_title: show.and_then(|s| s.playlist.show_title.clone()),
            elapsed: self.player.elapsed(),
            duration: self.known_duration(index),
            is_playing: self.state == PlaybackState::Playing,
        }
    }

    // ===== Network =====

    /// Connectivity came back after an outage
    pub fn on_network_regained(&mut self) {
        if self.is_terminal_failure() {
            info!(source = %self.source, "Network regained, retrying failed track");
            if let Err(err) = self.retry() {
                debug!(source = %self.source, error = %err, "Retry after reconnect skipped");
            }
        } else if matches!(
            self.state,
            PlaybackState::Ready | PlaybackState::Playing | PlaybackState::Paused
        ) {
            self.refresh_lookahead();
        }
    }

    /// Re-run look-ahead against the current network policy
    pub fn refresh_lookahead(&mut self) {
        let (Some(show), Some(current)) = (self.show.as_ref(), self.current.as_ref()) else {
            return;
        };
        self.buffer.preload(
            &show.playlist,
            current.index,
            self.config.preload_limit,
            &self.mailbox,
        );
    }

    // ===== Inbound events =====

    /// Handle a lifecycle event from the player
    pub fn handle_player_event(&mut self, event: PlayerEvent) {
        let Some(current) = self.current.as_ref() else {
            trace!(source = %self.source, ?event, "Player event with nothing loaded");
            return;
        };
        if current.item != Some(event.item()) {
            trace!(source = %self.source, ?event, "Ignoring event for a replaced item");
            return;
        }
        let index = current.index;

        match event {
            PlayerEvent::ItemReady { .. } => self.on_ready(index),
            PlayerEvent::ItemFailed { reason, .. } => self.on_failed(index, reason),
            PlayerEvent::ItemEnded { .. } => self.on_ended(index),
        }
    }

    fn on_ready(&mut self, index: usize) {
        if self.state != PlaybackState::Loading {
            return;
        }
        self.cancel_retry();
        self.retry.reset();
        self.set_state(PlaybackState::Ready);
        self.emit(EngineEvent::TrackReady { index });
        self.refresh_lookahead();
        if self.autoplay {
            self.emit(EngineEvent::StartRequested);
        }
    }

    fn on_failed(&mut self, index: usize, reason: String) {
        if let Some(current) = self.current.as_mut() {
            current.item = None;
        }
        self.cancel_fade();

        match self.retry.record_failure() {
            RetryDecision::RetryAfter { attempt, delay } => {
                warn!(
                    source = %self.source,
                    index,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    reason = %reason,
                    "Track load failed, retrying"
                );
                self.set_state(PlaybackState::Failed);
                self.emit(EngineEvent::TrackFailed {
                    index,
                    error: TrackFailure::Load(LoadError::Transient(reason)),
                    terminal: false,
                });
                self.emit(EngineEvent::RetryScheduled {
                    index,
                    attempt,
                    delay,
                });
                self.schedule_retry(delay);
            }
            RetryDecision::Exhausted { attempts } => {
                error!(
                    source = %self.source,
                    index,
                    attempts,
                    reason = %reason,
                    "Track failed, giving up"
                );
                self.fail_terminal(
                    index,
                    TrackFailure::Load(LoadError::Exhausted { index, attempts }),
                );
            }
        }
    }

    fn on_ended(&mut self, index: usize) {
        self.emit(EngineEvent::TrackEnded { index });

        let Some(show) = self.show.as_mut() else {
            return;
        };
        if show.playlist.last_index() != Some(index) {
            // A pause still fading out keeps the next track silent
            let autoplay = self.autoplay;
            self.switch_to(index + 1, autoplay);
            return;
        }

        show.completed = true;
        let show_id = show.playlist.show_id.clone();
        info!(source = %self.source, show = %show_id, "Show completed");

        self.cancel_fade();
        self.autoplay = false;
        self.player.pause();
        if let Some(current) = self.current.as_mut() {
            current.item = None;
        }
        self.set_state(PlaybackState::Completed);
        self.emit(EngineEvent::History(HistoryMark::Completed(show_id.clone())));
        self.emit(EngineEvent::ShowCompleted { show: show_id });
    }

    /// Handle a background completion
    pub fn handle_message(&mut self, message: EngineMessage<B::Item>) {
        match message {
            EngineMessage::FadeStep { fade_id, step } => self.on_fade_step(fade_id, step),
            EngineMessage::RetryDue { ticket } => self.on_retry_due(ticket),
            EngineMessage::Preloaded(preloaded) => {
                if let Some(index) = self.current_index() {
                    self.buffer
                        .merge(preloaded, index, self.config.preload_limit);
                }
            }
        }
    }

    // ===== Fades =====

    fn start_fade(&mut self, direction: FadeDirection, from: f32, to: f32) {
        self.cancel_fade();
        self.next_fade_id += 1;
        let id = self.next_fade_id;
        let ramp = VolumeRamp::new(from, to, self.config.fade_steps);
        let token = CancellationToken::new();

        let steps = ramp.steps();
        let interval = self.config.fade_step_interval();
        let mailbox = self.mailbox.clone();
        let cancelled = token.clone();
        tokio::spawn(async move {
            for step in 1..=steps {
                tokio::select! {
                    () = cancelled.cancelled() => return,
                    () = tokio::time::sleep(interval) => {}
                }
                mailbox.post(EngineMessage::FadeStep { fade_id: id, step });
            }
        });

        trace!(source = %self.source, fade = id, ?direction, from, to, "Fade started");
        self.fade = Some(ActiveFade {
            id,
            direction,
            ramp,
            token,
        });
    }

    fn cancel_fade(&mut self) {
        if let Some(fade) = self.fade.take() {
            fade.token.cancel();
        }
    }

    fn on_fade_step(&mut self, fade_id: u64, step: u32) {
        let Some(fade) = self.fade.as_ref().filter(|f| f.id == fade_id) else {
            trace!(source = %self.source, fade_id, step, "Ignoring stale fade step");
            return;
        };
        let level = fade.ramp.level_at(step);
        let last = fade.ramp.is_last(step);
        let direction = fade.direction;

        self.player.set_volume(level);
        if last {
            self.fade = None;
            if direction == FadeDirection::Out {
                self.player.pause();
                self.set_state(PlaybackState::Paused);
            }
        }
    }

    // ===== Retry timer =====

    fn schedule_retry(&mut self, delay: Duration) {
        self.cancel_retry();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let token = CancellationToken::new();

        let mailbox = self.mailbox.clone();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    mailbox.post(EngineMessage::RetryDue { ticket });
                }
            }
        });

        self.pending_retry = Some(PendingRetry { ticket, token });
    }

    fn cancel_retry(&mut self) {
        if let Some(pending) = self.pending_retry.take() {
            pending.token.cancel();
        }
    }

    fn on_retry_due(&mut self, ticket: u64) {
        if self.pending_retry.as_ref().map(|p| p.ticket) != Some(ticket) {
            trace!(source = %self.source, ticket, "Ignoring stale retry");
            return;
        }
        self.pending_retry = None;
        if self.state != PlaybackState::Failed || self.terminal {
            return;
        }
        if let Some(index) = self.current_index() {
            info!(source = %self.source, index, attempt = self.retry.attempt(), "Reloading after backoff");
            self.reload_current(index);
        }
    }
}

impl<B, P> Pausable for PlaybackEngine<B, P>
where
    B: MediaBackend,
    P: MediaPlayer<Item = B::Item>,
{
    fn source(&self) -> SourceId {
        self.source
    }

    fn pause(&mut self) {
        PlaybackEngine::pause(self);
    }

    fn force_pause(&mut self) {
        PlaybackEngine::force_pause(self);
    }

    fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    fn has_loaded_track(&self) -> bool {
        self.current.is_some() && self.state != PlaybackState::Idle
    }
}

impl<B, P> Drop for PlaybackEngine<B, P>
where
    B: MediaBackend,
    P: MediaPlayer<Item = B::Item>,
{
    fn drop(&mut self) {
        self.cancel_fade();
        self.cancel_retry();
        self.buffer.invalidate_all();
    }
}
