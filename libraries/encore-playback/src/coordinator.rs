//! Single arbiter of which source may be audible
//!
//! The coordinator knows sources only through the [`Pausable`] capability,
//! borrowed for the duration of each call. It owns the active-source value
//! and publishes it on a `watch` channel.
//!
//! A demoted engine fades out before it really pauses, so it keeps
//! reporting `is_playing` for a few hundred milliseconds. A start requested
//! meanwhile is deferred and handed back from [`PlaybackCoordinator::reconcile`]
//! once every demoted source has gone quiet, so two sources are never
//! playing at the same time.

use encore_core::SourceId;
use std::collections::BTreeSet;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What the coordinator needs from a playback source
pub trait Pausable {
    fn source(&self) -> SourceId;

    /// Regular pause, possibly faded
    fn pause(&mut self);

    /// Immediate pause for conflict resolution
    fn force_pause(&mut self) {
        self.pause();
    }

    fn is_playing(&self) -> bool;

    /// Has a track (or video) loaded that could be resumed
    fn has_loaded_track(&self) -> bool;
}

/// Outcome of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// Start now
    Granted,
    /// Wait for `reconcile` to hand the start back
    Deferred,
}

pub struct PlaybackCoordinator {
    active: Option<SourceId>,
    pending_start: Option<SourceId>,
    demoting: BTreeSet<SourceId>,
    active_tx: watch::Sender<Option<SourceId>>,
}

impl PlaybackCoordinator {
    pub fn new() -> Self {
        let (active_tx, _rx) = watch::channel(None);
        Self {
            active: None,
            pending_start: None,
            demoting: BTreeSet::new(),
            active_tx,
        }
    }

    pub fn active(&self) -> Option<SourceId> {
        self.active
    }

    pub fn pending_start(&self) -> Option<SourceId> {
        self.pending_start
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SourceId>> {
        self.active_tx.subscribe()
    }

    fn publish(&mut self, active: Option<SourceId>) {
        if self.active != active {
            info!(from = ?self.active, to = ?active, "Active source changed");
            self.active = active;
            self.active_tx.send_replace(active);
        }
    }

    /// Make `source` the active one, pausing the previous active source
    pub fn set_active(&mut self, source: SourceId, sources: &mut [&mut dyn Pausable]) {
        if let Some(previous) = self.active.filter(|&a| a != source) {
            if let Some(old) = find(sources, previous) {
                debug!(from = %previous, to = %source, "Demoting active source");
                old.pause();
                if old.is_playing() {
                    self.demoting.insert(previous);
                }
            }
        }
        self.demoting.remove(&source);
        if self.pending_start.is_some_and(|p| p != source) {
            self.pending_start = None;
        }
        self.publish(Some(source));
    }

    /// Ask to make `source` audible
    pub fn request_start(
        &mut self,
        source: SourceId,
        sources: &mut [&mut dyn Pausable],
    ) -> StartDecision {
        self.set_active(source, sources);

        let still_audible = sources
            .iter()
            .any(|s| s.source() != source && self.demoting.contains(&s.source()) && s.is_playing());
        if still_audible {
            debug!(source = %source, demoting = ?self.demoting, "Deferring start");
            self.pending_start = Some(source);
            StartDecision::Deferred
        } else {
            self.demoting.clear();
            self.pending_start = None;
            StartDecision::Granted
        }
    }

    /// Drop a deferred start for `source`
    ///
    /// Called when the source is paused or stopped before its start was
    /// released, so `reconcile` never hands it back.
    pub fn cancel_start(&mut self, source: SourceId) {
        if self.pending_start == Some(source) {
            debug!(source = %source, "Deferred start cancelled");
            self.pending_start = None;
        }
    }

    /// Pause whichever source is active
    pub fn pause_active(&mut self, sources: &mut [&mut dyn Pausable]) {
        self.pending_start = None;
        if let Some(active) = self.active {
            if let Some(source) = find(sources, active) {
                source.pause();
            }
        }
    }

    /// Re-derive the active source from what the sources report
    ///
    /// - several audible sources (other than ones still fading out): the
    ///   active one wins, the rest are force-paused
    /// - nothing audible: keep the active source if it still has a track
    ///   loaded, else move to any source with a loaded track, else none
    ///
    /// Returns a deferred start that may now proceed.
    pub fn reconcile(&mut self, sources: &mut [&mut dyn Pausable]) -> Option<SourceId> {
        self.demoting
            .retain(|&d| sources.iter().any(|s| s.source() == d && s.is_playing()));

        let contenders: Vec<SourceId> = sources
            .iter()
            .filter(|s| s.is_playing() && !self.demoting.contains(&s.source()))
            .map(|s| s.source())
            .collect();

        match contenders.as_slice() {
            [] => {
                if self.pending_start.is_none() {
                    let keep = self
                        .active
                        .filter(|&a| find(sources, a).is_some_and(|s| s.has_loaded_track()));
                    let next = keep.or_else(|| {
                        sources
                            .iter()
                            .find(|s| s.has_loaded_track())
                            .map(|s| s.source())
                    });
                    self.publish(next);
                }
            }
            [only] => {
                if self.active != Some(*only) && self.pending_start.is_none() {
                    self.publish(Some(*only));
                }
            }
            several => {
                let winner = self
                    .active
                    .filter(|a| several.contains(a))
                    .unwrap_or(several[0]);
                warn!(winner = %winner, playing = ?several, "Several sources audible, forcing pause");
                for source in sources.iter_mut() {
                    let id = source.source();
                    if id != winner && several.contains(&id) {
                        source.force_pause();
                    }
                }
                self.publish(Some(winner));
            }
        }

        if self.demoting.is_empty() {
            self.pending_start.take()
        } else {
            None
        }
    }

    /// Number of sources audible right now
    pub fn audible_count(sources: &[&mut dyn Pausable]) -> usize {
        sources.iter().filter(|s| s.is_playing()).count()
    }
}

impl Default for PlaybackCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn find<'s, 'p>(
    sources: &'s mut [&'p mut dyn Pausable],
    id: SourceId,
) -> Option<&'s mut &'p mut dyn Pausable> {
    sources.iter_mut().find(|s| s.source() == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pauses instantly, or after `fade_ticks` calls to `tick` when set
    struct FakeSource {
        id: SourceId,
        playing: bool,
        loaded: bool,
        fade_ticks: Option<u32>,
        fading: Option<u32>,
    }

    impl FakeSource {
        fn new(id: SourceId) -> Self {
            Self {
                id,
                playing: false,
                loaded: false,
                fade_ticks: None,
                fading: None,
            }
        }

        fn playing(id: SourceId) -> Self {
            Self {
                playing: true,
                loaded: true,
                ..Self::new(id)
            }
        }

        fn tick(&mut self) {
            if let Some(left) = self.fading {
                if left <= 1 {
                    self.fading = None;
                    self.playing = false;
                } else {
                    self.fading = Some(left - 1);
                }
            }
        }
    }

    impl Pausable for FakeSource {
        fn source(&self) -> SourceId {
            self.id
        }

        fn pause(&mut self) {
            match self.fade_ticks {
                Some(ticks) if self.playing => self.fading = Some(ticks),
                _ => self.playing = false,
            }
        }

        fn force_pause(&mut self) {
            self.fading = None;
            self.playing = false;
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn has_loaded_track(&self) -> bool {
            self.loaded
        }
    }

    #[test]
    fn set_active_pauses_previous() {
        let mut dead = FakeSource::playing(SourceId::Dead);
        let mut jerry = FakeSource::new(SourceId::Jerry);
        let mut coordinator = PlaybackCoordinator::new();

        coordinator.set_active(SourceId::Dead, &mut [&mut dead, &mut jerry]);
        coordinator.set_active(SourceId::Jerry, &mut [&mut dead, &mut jerry]);

        assert!(!dead.playing);
        assert_eq!(coordinator.active(), Some(SourceId::Jerry));
    }

    #[test]
    fn start_is_deferred_until_fade_out_finishes() {
        let mut dead = FakeSource::playing(SourceId::Dead);
        dead.fade_ticks = Some(2);
        let mut jerry = FakeSource::new(SourceId::Jerry);
        jerry.loaded = true;
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.set_active(SourceId::Dead, &mut [&mut dead, &mut jerry]);

        let decision = coordinator.request_start(SourceId::Jerry, &mut [&mut dead, &mut jerry]);
        assert_eq!(decision, StartDecision::Deferred);
        assert!(dead.playing);

        dead.tick();
        assert_eq!(coordinator.reconcile(&mut [&mut dead, &mut jerry]), None);

        dead.tick();
        assert_eq!(
            coordinator.reconcile(&mut [&mut dead, &mut jerry]),
            Some(SourceId::Jerry)
        );
        assert_eq!(coordinator.active(), Some(SourceId::Jerry));
    }

    #[test]
    fn cancelled_start_is_not_handed_back() {
        let mut dead = FakeSource::playing(SourceId::Dead);
        dead.fade_ticks = Some(1);
        let mut jerry = FakeSource::new(SourceId::Jerry);
        jerry.loaded = true;
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.set_active(SourceId::Dead, &mut [&mut dead, &mut jerry]);

        let decision = coordinator.request_start(SourceId::Jerry, &mut [&mut dead, &mut jerry]);
        assert_eq!(decision, StartDecision::Deferred);

        // Another source's cancel leaves the pending start alone
        coordinator.cancel_start(SourceId::Youtube);
        assert_eq!(coordinator.pending_start(), Some(SourceId::Jerry));

        coordinator.cancel_start(SourceId::Jerry);
        assert_eq!(coordinator.pending_start(), None);

        dead.tick();
        assert_eq!(coordinator.reconcile(&mut [&mut dead, &mut jerry]), None);
        assert!(!dead.playing && !jerry.playing);
        assert_eq!(coordinator.active(), Some(SourceId::Jerry));
    }

    #[test]
    fn previous_active_wins_a_race() {
        let mut dead = FakeSource::playing(SourceId::Dead);
        let mut jerry = FakeSource::new(SourceId::Jerry);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.set_active(SourceId::Dead, &mut [&mut dead, &mut jerry]);

        jerry.playing = true;
        jerry.loaded = true;
        coordinator.reconcile(&mut [&mut dead, &mut jerry]);

        assert!(dead.playing);
        assert!(!jerry.playing);
        assert_eq!(coordinator.active(), Some(SourceId::Dead));
    }

    #[test]
    fn idle_sources_keep_loaded_active_then_clear() {
        let mut dead = FakeSource::playing(SourceId::Dead);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.set_active(SourceId::Dead, &mut [&mut dead]);

        dead.playing = false;
        coordinator.reconcile(&mut [&mut dead]);
        assert_eq!(coordinator.active(), Some(SourceId::Dead));

        dead.loaded = false;
        coordinator.reconcile(&mut [&mut dead]);
        assert_eq!(coordinator.active(), None);
    }

    #[test]
    fn pause_active_pauses_only_active() {
        let mut dead = FakeSource::playing(SourceId::Dead);
        let mut video = FakeSource::playing(SourceId::Youtube);
        let mut coordinator = PlaybackCoordinator::new();
        coordinator.set_active(SourceId::Youtube, &mut [&mut dead, &mut video]);
        dead.playing = true;

        coordinator.pause_active(&mut [&mut dead, &mut video]);
        assert!(!video.playing);
        assert!(dead.playing);
    }

    #[test]
    fn active_value_is_published() {
        let mut dead = FakeSource::new(SourceId::Dead);
        let mut coordinator = PlaybackCoordinator::new();
        let rx = coordinator.subscribe();

        coordinator.set_active(SourceId::Dead, &mut [&mut dead]);
        assert_eq!(*rx.borrow(), Some(SourceId::Dead));
    }
}
