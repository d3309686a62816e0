use std::sync::Arc;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Mutex, Notify},
    task::JoinHandle,
};

use crate::connectivity::Connectivity;

use super::{context::RuntimeError, worker::WorkerHandle};

/// Message the page posts to its worker.
///
/// Serialized as `{"type": "SYNC_OFFLINE_DATA"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContextMessage {
    /// Run a replay pass now.
    #[serde(rename = "SYNC_OFFLINE_DATA")]
    SyncOfflineData,
}

impl ContextMessage {
    /// Wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses the wire form; unknown `type`s are errors.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Platform background-sync registry.
///
/// The page registers tags; a dispatcher fires each pending tag at the worker
/// once connectivity is available. Registering a tag that is already pending
/// does not queue a second event.
#[derive(Clone, Default)]
pub struct BackgroundSync {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    pending: Mutex<HashSet<String>>,
    wake: Notify,
}

impl BackgroundSync {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a one-shot sync for `tag`. Returns false if it was already pending.
    pub async fn register(&self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let inserted = self.inner.pending.lock().await.insert(tag.clone());
        if inserted {
            tracing::debug!(%tag, "background sync registered");
            self.inner.wake.notify_one();
        }
        inserted
    }

    /// Tags registered and not yet delivered, sorted.
    pub async fn pending(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.inner.pending.lock().await.iter().cloned().collect();
        tags.sort();
        tags
    }

    async fn take_pending(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.inner.pending.lock().await.drain().collect();
        tags.sort();
        tags
    }

    async fn requeue(&self, tag: String) {
        self.inner.pending.lock().await.insert(tag);
    }

    /// Starts delivering pending tags to `worker` whenever `connectivity` is online.
    ///
    /// A tag whose pass fails stays pending until the next connectivity change
    /// or registration. The task ends when the worker shuts down.
    pub fn spawn_dispatcher(&self, worker: WorkerHandle, connectivity: &Connectivity) -> JoinHandle<()> {
        let registry = self.clone();
        let mut online_rx = connectivity.subscribe();

        tokio::spawn(async move {
            let mut watching = true;
            loop {
                let online = online_rx.borrow_and_update().online;
                if online {
                    for tag in registry.take_pending().await {
                        match worker.dispatch_sync(tag.clone()).await {
                            Ok(_) => {}
                            Err(RuntimeError::ChannelClosed) => return,
                            Err(err) => {
                                tracing::warn!(%tag, error = %err, "background sync failed, keeping it pending");
                                registry.requeue(tag).await;
                            }
                        }
                    }
                }

                tokio::select! {
                    changed = online_rx.changed(), if watching => {
                        if changed.is_err() {
                            watching = false;
                        }
                    }
                    _ = registry.inner.wake.notified() => {}
                }
            }
        })
    }
}
