//! Observed online/offline flag shared by the capture layer and triggers.

use std::sync::Arc;

use tokio::sync::watch;

/// Snapshot published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkState {
    /// Whether the device is currently observed online.
    pub online: bool,
    /// Number of offline-to-online edges seen so far.
    ///
    /// Watch receivers only see the latest value, so a quick offline/online
    /// flip can look like no change at all through `online`. Comparing this
    /// counter catches every restore.
    pub restores: u64,
}

/// Last observed connectivity. Clones observe the same flag.
///
/// The flag is an observation fed in by whatever watches the platform; the
/// capture layer only reads it and never infers it from request failures.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<LinkState>>,
}

impl Connectivity {
    /// Starts with `online` and no restores recorded.
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(LinkState { online, restores: 0 });
        Self { tx: Arc::new(tx) }
    }

    /// Current observation.
    pub fn is_online(&self) -> bool {
        self.tx.borrow().online
    }

    /// Offline-to-online edges recorded so far.
    pub fn restores(&self) -> u64 {
        self.tx.borrow().restores
    }

    /// Records a new observation. Returns true when the value changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if current.online == online {
                return false;
            }
            current.online = online;
            if online {
                current.restores = current.restores.wrapping_add(1);
            }
            true
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
        changed
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}
