/// Signed-in user entry.
pub mod session;
/// SQLite queue store.
pub mod sqlite;

use std::{path::Path, sync::Arc, time::Duration};

use tokio::sync::Mutex;

use crate::{
    record::{QueueDraft, QueueRecord},
    types::{DeleteOutcome, RecordId},
};

/// Storage-layer error.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Payload could not be (de)serialized.
    #[error("payload serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    /// The database was written by a newer schema.
    #[error("unsupported store format version {found}")]
    UnsupportedFormat {
        /// `user_version` found on disk.
        found: i64,
    },
    /// The blocking store task panicked or was cancelled.
    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    /// Generic store error.
    #[error("{0}")]
    Message(String),
}

/// Convenience result alias for storage operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Durable collection of pending writes.
///
/// Records are only ever added and deleted. Implementations must tolerate the
/// same underlying storage being opened by more than one handle.
pub trait QueueStore: Send {
    /// Stores `draft` under a newly allocated id and returns it.
    fn add(&mut self, draft: QueueDraft) -> PersistResult<RecordId>;

    /// All records in enqueue order.
    fn list_all(&self) -> PersistResult<Vec<QueueRecord>>;

    /// All records ordered by creation timestamp. Inspection only.
    fn list_by_timestamp(&self) -> PersistResult<Vec<QueueRecord>> {
        let mut records = self.list_all()?;
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    /// Removes the record `id`. Deleting a missing id is not an error.
    fn delete_by_id(&mut self, id: RecordId) -> PersistResult<DeleteOutcome>;

    /// Number of queued records.
    fn len(&self) -> PersistResult<usize> {
        Ok(self.list_all()?.len())
    }
}

/// Async handle over a [`QueueStore`].
///
/// Each call runs on the blocking pool so the calling context yields while the
/// store works. Clones share the same underlying store.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<Box<dyn QueueStore>>>,
}

impl StoreHandle {
    /// Wraps `store`.
    pub fn new(store: impl QueueStore + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(store))),
        }
    }

    /// Opens (or creates) the SQLite store at `path` off the async thread.
    pub async fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> PersistResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = tokio::task::spawn_blocking(move || {
            sqlite::SqliteQueueStore::open_with_timeout(path, busy_timeout)
        })
        .await??;
        Ok(Self::new(store))
    }

    /// See [`QueueStore::add`].
    pub async fn add(&self, draft: QueueDraft) -> PersistResult<RecordId> {
        let store_ref = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut store = store_ref.blocking_lock();
            store.add(draft)
        })
        .await?
    }

    /// See [`QueueStore::list_all`].
    pub async fn list_all(&self) -> PersistResult<Vec<QueueRecord>> {
        let store_ref = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let store = store_ref.blocking_lock();
            store.list_all()
        })
        .await?
    }

    /// See [`QueueStore::list_by_timestamp`].
    pub async fn list_by_timestamp(&self) -> PersistResult<Vec<QueueRecord>> {
        let store_ref = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let store = store_ref.blocking_lock();
            store.list_by_timestamp()
        })
        .await?
    }

    /// See [`QueueStore::delete_by_id`].
    pub async fn delete_by_id(&self, id: RecordId) -> PersistResult<DeleteOutcome> {
        let store_ref = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut store = store_ref.blocking_lock();
            store.delete_by_id(id)
        })
        .await?
    }

    /// See [`QueueStore::len`].
    pub async fn len(&self) -> PersistResult<usize> {
        let store_ref = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let store = store_ref.blocking_lock();
            store.len()
        })
        .await?
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}
