use tokio::sync::broadcast;

use crate::{
    persist::{PersistError, StoreHandle},
    replay::{ReplayReport, replay_pass},
    transport::Transport,
    types::ContextKind,
};

use super::events::SyncEvent;

/// Error returned by context handles.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The pass could not read the queue.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// The context has shut down.
    #[error("context channel closed")]
    ChannelClosed,
}

/// Entry point both contexts converge on.
pub(crate) async fn run_pass(
    context: ContextKind,
    store: &StoreHandle,
    transport: &dyn Transport,
    events_tx: &broadcast::Sender<SyncEvent>,
) -> Result<ReplayReport, RuntimeError> {
    match replay_pass(store, transport).await {
        Ok(report) => {
            // No subscribers is fine.
            let _ = events_tx.send(SyncEvent::PassCompleted {
                context,
                report: report.clone(),
            });
            Ok(report)
        }
        Err(err) => {
            tracing::error!(%context, error = %err, "replay pass failed");
            // No subscribers is fine.
            let _ = events_tx.send(SyncEvent::PassFailed {
                context,
                message: err.to_string(),
            });
            Err(err.into())
        }
    }
}
