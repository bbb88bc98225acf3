//! Property-based tests for coordination and look-ahead
//!
//! Uses proptest to drive random operation sequences and check the
//! invariants after every step.

mod common;

use common::*;
use encore_core::{ByteRange, NetworkState, SourceId};
use encore_playback::{
    BufferPolicy, ItemId, Pausable, PlaybackConfig, PlaybackCoordinator, Preloaded,
    StartDecision, TrackBuffer,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

// ===== Helpers =====

/// Source whose pause takes `FADE_TICKS` ticks to go quiet
struct FadingSource {
    id: SourceId,
    playing: bool,
    loaded: bool,
    fading: Option<u32>,
}

const FADE_TICKS: u32 = 3;

impl FadingSource {
    fn new(id: SourceId) -> Self {
        Self {
            id,
            playing: false,
            loaded: false,
            fading: None,
        }
    }

    fn start(&mut self) {
        self.playing = true;
        self.loaded = true;
        self.fading = None;
    }

    fn tick(&mut self) {
        match self.fading {
            Some(left) if left <= 1 => {
                self.fading = None;
                self.playing = false;
            }
            Some(left) => self.fading = Some(left - 1),
            None => {}
        }
    }
}

impl Pausable for FadingSource {
    fn source(&self) -> SourceId {
        self.id
    }

    fn pause(&mut self) {
        if self.playing && self.fading.is_none() {
            self.fading = Some(FADE_TICKS);
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

#[derive(Debug, Clone, Copy)]
enum Op {
    Start(usize),
    Pause(usize),
    PauseActive,
    Tick,
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3).prop_map(Op::Start),
        (0usize..3).prop_map(Op::Pause),
        Just(Op::PauseActive),
        Just(Op::Tick),
        Just(Op::Tick),
    ]
}

struct World {
    sources: Vec<FadingSource>,
    coordinator: PlaybackCoordinator,
}

impl World {
    fn new() -> Self {
        Self {
            sources: SourceId::CATALOGS
                .iter()
                .copied()
                .chain(std::iter::once(SourceId::Youtube))
                .map(FadingSource::new)
                .collect(),
            coordinator: PlaybackCoordinator::new(),
        }
    }

    fn with_sources<T>(
        &mut self,
        f: impl FnOnce(&mut PlaybackCoordinator, &mut [&mut dyn Pausable]) -> T,
    ) -> T {
        let mut borrowed: Vec<&mut dyn Pausable> = self
            .sources
            .iter_mut()
            .map(|s| s as &mut dyn Pausable)
            .collect();
        f(&mut self.coordinator, &mut borrowed)
    }

    fn start(&mut self, id: SourceId) {
        if let Some(source) = self.sources.iter_mut().find(|s| s.id == id) {
            source.start();
        }
    }

    fn settle(&mut self) {
        for _ in 0..4 {
            match self.with_sources(|c, s| c.reconcile(s)) {
                Some(id) => self.start(id),
                None => break,
            }
        }
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::Start(i) => {
                let id = self.sources[i].id;
                if self.with_sources(|c, s| c.request_start(id, s)) == StartDecision::Granted {
                    self.start(id);
                }
            }
            Op::Pause(i) => self.sources[i].pause(),
            Op::PauseActive => self.with_sources(|c, s| c.pause_active(s)),
            Op::Tick => self.sources.iter_mut().for_each(FadingSource::tick),
        }
        self.settle();
    }

    fn audible(&self) -> usize {
        self.sources.iter().filter(|s| s.playing).count()
    }
}

fn buffer(limit_config: &PlaybackConfig) -> TrackBuffer<FakeBackend> {
    let (_tx, rx) = watch::channel(NetworkState::wifi());
    TrackBuffer::new(
        Arc::new(FakeBackend::new()),
        rx,
        BufferPolicy::from_config(limit_config),
    )
}

fn preloaded(index: usize, epoch: u64) -> Preloaded<FakeItem> {
    Preloaded {
        epoch,
        track_index: index,
        item_id: ItemId(index as u64 + 1000),
        range: ByteRange::open_ended(),
        preferred_buffer: Duration::from_secs(60),
        result: Ok(FakeItem {
            track_index: index,
            url: track_url("prop", index),
            range: ByteRange::open_ended(),
            preferred_buffer: Duration::from_secs(60),
        }),
    }
}

#[derive(Debug, Clone, Copy)]
enum BufferOp {
    Arrive(usize),
    Move(usize),
    Consume(usize),
}

fn arbitrary_buffer_op() -> impl Strategy<Value = BufferOp> {
    prop_oneof![
        (0usize..12).prop_map(BufferOp::Arrive),
        (0usize..12).prop_map(BufferOp::Move),
        (0usize..12).prop_map(BufferOp::Consume),
    ]
}

// ===== Property Tests =====

proptest! {
    /// Property: at most one source is ever audible, and a deferred start
    /// always goes through once the fades have finished
    #[test]
    fn at_most_one_source_is_audible(ops in prop::collection::vec(arbitrary_op(), 1..80)) {
        let mut world = World::new();

        for op in ops {
            world.apply(op);
            prop_assert!(world.audible() <= 1, "after {:?}: {} audible", op, world.audible());
        }

        for _ in 0..=FADE_TICKS {
            world.apply(Op::Tick);
        }
        prop_assert!(world.coordinator.pending_start().is_none());
    }

    /// Property: the look-ahead map never exceeds the limit and only holds
    /// tracks after the current one
    #[test]
    fn buffer_stays_within_the_window(
        limit in 1usize..4,
        ops in prop::collection::vec(arbitrary_buffer_op(), 1..60)
    ) {
        let config = PlaybackConfig { preload_limit: limit, ..PlaybackConfig::default() };
        let mut buffer = buffer(&config);
        let mut current = 0usize;

        for op in ops {
            match op {
                BufferOp::Arrive(index) => {
                    buffer.merge(preloaded(index, 0), current, limit);
                }
                BufferOp::Move(index) => {
                    current = index;
                    buffer.retain_window(current, limit);
                }
                BufferOp::Consume(index) => {
                    if let Some(item) = buffer.consume(index) {
                        prop_assert_eq!(item.track_index, index);
                    }
                    current = index;
                    buffer.retain_window(current, limit);
                }
            }

            prop_assert!(buffer.len() <= limit);
            for index in buffer.buffered_indices() {
                prop_assert!(index > current && index <= current + limit);
            }
        }
    }

    /// Property: results from an invalidated generation are never merged
    #[test]
    fn stale_preloads_are_rejected(indices in prop::collection::vec(1usize..4, 1..10)) {
        let mut buffer = buffer(&PlaybackConfig::default());
        buffer.invalidate_all();

        for index in indices {
            prop_assert!(!buffer.merge(preloaded(index, 0), 0, 3));
        }
        prop_assert!(buffer.is_empty());
    }
}
