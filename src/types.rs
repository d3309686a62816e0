//! Shared primitive IDs, constants and small enums.

use serde::{Deserialize, Serialize};

/// Time-based, strictly increasing queue record identifier.
pub type RecordId = u64;

/// Fixed identifier of the durable queue store.
pub const STORE_NAME: &str = "offline_sync";

/// Tag agreed between the page and the worker for background sync.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Result of deleting a queued record by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteOutcome {
    /// The record existed and is now gone.
    Deleted,
    /// No record with that id was present.
    NotFound,
}

/// Which execution context is driving a replay pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKind {
    /// The application page.
    Page,
    /// The background service worker.
    Worker,
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page => f.write_str("page"),
            Self::Worker => f.write_str("worker"),
        }
    }
}
