use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    config::SyncConfig,
    persist::StoreHandle,
    replay::ReplayReport,
    transport::Transport,
    types::ContextKind,
};

use super::{
    context::{RuntimeError, run_pass},
    events::SyncEvent,
    notifier::ContextMessage,
};

/// Handle to a running worker context.
#[derive(Clone)]
pub struct WorkerHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<SyncEvent>,
}

enum Command {
    Message {
        message: ContextMessage,
        resp: Option<oneshot::Sender<Result<ReplayReport, RuntimeError>>>,
    },
    Sync {
        tag: String,
        resp: oneshot::Sender<Result<Option<ReplayReport>, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Starts the worker context.
///
/// The worker owns its own store handle and shares nothing with the page
/// except what goes through the store and its command channel.
pub fn spawn_worker_context(
    store: StoreHandle,
    transport: Arc<dyn Transport>,
    config: &SyncConfig,
) -> WorkerHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<SyncEvent>(config.event_capacity);

    let events_tx_loop = events_tx.clone();
    let sync_tag = config.background_sync_tag.clone();

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Message { message, resp } => match message {
                    ContextMessage::SyncOfflineData => {
                        tracing::info!("worker received sync request from page");
                        let out = run_pass(ContextKind::Worker, &store, transport.as_ref(), &events_tx_loop).await;
                        if let Some(resp) = resp {
                            let _ = resp.send(out);
                        }
                    }
                },
                Command::Sync { tag, resp } => {
                    if tag != sync_tag {
                        tracing::debug!(%tag, "ignoring sync event for unknown tag");
                        // No subscribers is fine.
                        let _ = events_tx_loop.send(SyncEvent::SyncTagIgnored { tag });
                        let _ = resp.send(Ok(None));
                        continue;
                    }
                    tracing::info!(%tag, "worker running background sync");
                    let out = run_pass(ContextKind::Worker, &store, transport.as_ref(), &events_tx_loop).await;
                    let _ = resp.send(out.map(Some));
                }
                Command::Shutdown { resp } => {
                    let _ = resp.send(());
                    break;
                }
            }
        }
        tracing::debug!("worker context stopped");
    });

    WorkerHandle { cmd_tx, events_tx }
}

impl WorkerHandle {
    /// Subscribes to the worker's events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events_tx.subscribe()
    }

    /// Posts `message` without waiting for the pass it triggers.
    pub async fn post_message(&self, message: ContextMessage) -> Result<(), RuntimeError> {
        self.cmd_tx
            .send(Command::Message { message, resp: None })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Posts a raw JSON message. Returns false when the payload is not a
    /// message the worker understands; such payloads are dropped.
    pub async fn post_json_message(&self, raw: &str) -> Result<bool, RuntimeError> {
        match ContextMessage::from_json(raw) {
            Ok(message) => {
                self.post_message(message).await?;
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(error = %err, "dropping unrecognized worker message");
                Ok(false)
            }
        }
    }

    /// Posts `message` and waits for the resulting pass.
    pub async fn request(&self, message: ContextMessage) -> Result<ReplayReport, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Message {
                message,
                resp: Some(tx),
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Delivers a platform sync event. `Ok(None)` when the tag is not ours.
    pub async fn dispatch_sync(&self, tag: impl Into<String>) -> Result<Option<ReplayReport>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Sync {
                tag: tag.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Stops the worker loop and waits for it.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}
