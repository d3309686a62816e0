use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    config::SyncConfig,
    connectivity::Connectivity,
    persist::StoreHandle,
    replay::ReplayReport,
    transport::Transport,
    types::ContextKind,
};

use super::{
    context::{RuntimeError, run_pass},
    events::SyncEvent,
    notifier::{BackgroundSync, ContextMessage},
    worker::WorkerHandle,
};

/// Optional links from the page to the worker side.
#[derive(Clone, Default)]
pub struct PageLinks {
    /// Controlling worker, for explicit sync messages.
    pub worker: Option<WorkerHandle>,
    /// Background-sync registry, when the platform has one.
    pub background_sync: Option<BackgroundSync>,
}

/// Handle to a running page context.
#[derive(Clone)]
pub struct PageHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<SyncEvent>,
    worker: Option<WorkerHandle>,
}

enum Command {
    SyncNow {
        resp: oneshot::Sender<Result<ReplayReport, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

struct PageState {
    store: StoreHandle,
    transport: Arc<dyn Transport>,
    background_sync: Option<BackgroundSync>,
    sync_tag: String,
    events_tx: broadcast::Sender<SyncEvent>,
}

/// Starts the page context.
///
/// Each offline-to-online transition of `connectivity` runs a replay pass
/// directly, including transitions that happen while a pass is in flight. When background sync is available the one-shot tag is
/// registered first, so the worker still drains the queue if the page goes
/// away mid-pass.
pub fn spawn_page_context(
    store: StoreHandle,
    transport: Arc<dyn Transport>,
    connectivity: &Connectivity,
    links: PageLinks,
    config: &SyncConfig,
) -> PageHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<SyncEvent>(config.event_capacity);

    let state = PageState {
        store,
        transport,
        background_sync: links
            .background_sync
            .filter(|_| config.background_sync_supported),
        sync_tag: config.background_sync_tag.clone(),
        events_tx: events_tx.clone(),
    };
    let mut online_rx = connectivity.subscribe();
    let mut seen_restores = online_rx.borrow_and_update().restores;

    tokio::spawn(async move {
        let mut watching = true;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    match cmd {
                        Command::SyncNow { resp } => {
                            let out = run_pass(
                                ContextKind::Page,
                                &state.store,
                                state.transport.as_ref(),
                                &state.events_tx,
                            ).await;
                            let _ = resp.send(out);
                        }
                        Command::Shutdown { resp } => {
                            let _ = resp.send(());
                            break;
                        }
                    }
                }
                changed = online_rx.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                        continue;
                    }
                    let link = *online_rx.borrow_and_update();
                    let restored = link.online && link.restores != seen_restores;
                    seen_restores = link.restores;
                    if restored {
                        on_connectivity_restored(&state).await;
                    }
                }
            }
        }
        tracing::debug!("page context stopped");
    });

    PageHandle {
        cmd_tx,
        events_tx,
        worker: links.worker,
    }
}

async fn on_connectivity_restored(state: &PageState) {
    tracing::info!("connectivity restored, syncing offline writes");

    if let Some(registry) = &state.background_sync {
        registry.register(state.sync_tag.clone()).await;
        // No subscribers is fine.
        let _ = state.events_tx.send(SyncEvent::BackgroundSyncRegistered {
            tag: state.sync_tag.clone(),
        });
    }

    // Failures are already logged and reported as events; the next trigger
    // retries whatever is left.
    let _ = run_pass(
        ContextKind::Page,
        &state.store,
        state.transport.as_ref(),
        &state.events_tx,
    )
    .await;
}

impl PageHandle {
    /// Subscribes to the page's events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events_tx.subscribe()
    }

    /// Runs a replay pass in the page context, e.g. on explicit user action.
    pub async fn sync_now(&self) -> Result<ReplayReport, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SyncNow { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Asks the controlling worker to run a pass. Returns false when no
    /// worker controls this page.
    pub async fn request_worker_sync(&self) -> Result<bool, RuntimeError> {
        let Some(worker) = &self.worker else {
            return Ok(false);
        };
        worker.post_message(ContextMessage::SyncOfflineData).await?;
        Ok(true)
    }

    /// Stops the page loop and waits for it.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}
