//! Runtime event stream payloads.

use crate::{replay::ReplayReport, types::ContextKind};

/// Events emitted from a context's command loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A replay pass ran to the end.
    PassCompleted {
        /// Context that ran the pass.
        context: ContextKind,
        /// What happened to each record.
        report: ReplayReport,
    },
    /// A replay pass could not read the queue.
    PassFailed {
        /// Context that ran the pass.
        context: ContextKind,
        /// Store error text.
        message: String,
    },
    /// The page asked the platform for a background sync.
    BackgroundSyncRegistered {
        /// Registered tag.
        tag: String,
    },
    /// The worker received a sync event for a tag it does not own.
    SyncTagIgnored {
        /// Received tag.
        tag: String,
    },
}
