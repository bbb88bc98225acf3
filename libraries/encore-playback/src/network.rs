//! Network condition monitor
//!
//! Publishes the process-wide [`NetworkState`] on a `watch` channel. It is
//! the only writer; buffers and engines hold receivers and read the latest
//! value without ever mutating it. No playback logic lives here.

use encore_core::{InterfaceClass, NetworkState};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Raw path report from the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathUpdate {
    /// The path can carry traffic
    pub satisfied: bool,
    pub uses_wifi: bool,
    pub uses_cellular: bool,
}

impl PathUpdate {
    pub fn wifi() -> Self {
        Self {
            satisfied: true,
            uses_wifi: true,
            uses_cellular: false,
        }
    }

    pub fn cellular() -> Self {
        Self {
            satisfied: true,
            uses_wifi: false,
            uses_cellular: true,
        }
    }

    pub fn offline() -> Self {
        Self::default()
    }

    /// Classify the report
    ///
    /// Wi-Fi wins when a path reports both interfaces. An unsatisfied path is
    /// unavailable whatever interface it names.
    pub fn to_state(self) -> NetworkState {
        let interface = if self.uses_wifi {
            InterfaceClass::Wifi
        } else if self.uses_cellular {
            InterfaceClass::Cellular
        } else {
            InterfaceClass::Other
        };
        NetworkState::new(self.satisfied, interface)
    }
}

/// Single writer of the current [`NetworkState`]
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<NetworkState>>,
}

impl NetworkMonitor {
    /// Start with a usable but unclassified path
    pub fn new() -> Self {
        Self::with_state(NetworkState::default())
    }

    pub fn with_state(initial: NetworkState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> NetworkState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.tx.subscribe()
    }

    /// Apply a path report, notifying subscribers only on an actual change
    ///
    /// Returns whether availability or interface class changed.
    pub fn apply(&self, update: PathUpdate) -> bool {
        self.set(update.to_state())
    }

    pub fn set(&self, next: NetworkState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            info!(
                available = next.available,
                interface = ?next.interface,
                was_available = state.available,
                "Network path changed"
            );
            *state = next;
            true
        })
    }

    /// Feed platform path callbacks into the monitor until the sender closes
    pub fn spawn_observer(&self, mut updates: mpsc::Receiver<PathUpdate>) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                if !monitor.apply(update) {
                    debug!(?update, "Path update without change");
                }
            }
            debug!("Path observer stopped");
        })
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}
