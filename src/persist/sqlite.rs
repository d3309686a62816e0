//! SQLite-backed durable queue store.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use crate::{
    record::{QueueDraft, QueueRecord, format_timestamp, next_record_id},
    types::{DeleteOutcome, RecordId},
};

use super::{PersistError, PersistResult, QueueStore};

/// Value stored in `PRAGMA user_version` once the schema is installed.
pub const SCHEMA_VERSION: i64 = 1;

/// Default wait before a locked database surfaces as an error.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const LAST_ID_KEY: &str = "last_id";

fn id_to_sql(id: RecordId) -> PersistResult<i64> {
    i64::try_from(id)
        .map_err(|_| PersistError::Message(format!("record id {id} is outside the store's key range")))
}

fn id_from_sql(value: i64) -> PersistResult<RecordId> {
    RecordId::try_from(value)
        .map_err(|_| PersistError::Message(format!("stored id {value} is negative")))
}

/// SQLite implementation of [`crate::persist::QueueStore`].
///
/// Every execution context opens its own connection; SQLite's file locking
/// serializes the individual add/list/delete transactions between them.
pub struct SqliteQueueStore {
    conn: Connection,
}

impl SqliteQueueStore {
    /// Opens or creates a store at `path`.
    ///
    /// Opening an existing store keeps its records. Enables WAL mode and sets
    /// `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Like [`Self::open`] with an explicit lock wait.
    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn, busy_timeout)
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn, DEFAULT_BUSY_TIMEOUT)
    }

    pub(crate) fn init_connection(conn: Connection, busy_timeout: Duration) -> PersistResult<Self> {
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(PersistError::UnsupportedFormat { found: version });
        }
        conn.execute_batch(include_str!("schema.sql"))?;
        if version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        Ok(Self { conn })
    }

    /// Highest id ever issued by this store, including deleted ones.
    pub fn last_issued_id(&self) -> PersistResult<RecordId> {
        let last: Option<i64> = self
            .conn
            .query_row(
                "SELECT value FROM queue_meta WHERE key = ?1",
                params![LAST_ID_KEY],
                |row| row.get(0),
            )
            .optional()?;
        id_from_sql(last.unwrap_or(0))
    }

    fn query_records(&self, sql: &str) -> PersistResult<Vec<QueueRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let endpoint: String = row.get(1)?;
            let data: String = row.get(2)?;
            let timestamp: String = row.get(3)?;

            let data = serde_json::from_str(&data).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(err),
                )
            })?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|err| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        Box::new(err),
                    )
                })?;

            let id = RecordId::try_from(id).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Integer,
                    Box::new(err),
                )
            })?;

            Ok(QueueRecord {
                id,
                endpoint,
                data,
                timestamp,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl QueueStore for SqliteQueueStore {
    fn add(&mut self, draft: QueueDraft) -> PersistResult<RecordId> {
        let data = serde_json::to_string(&draft.data)?;

        // IMMEDIATE takes the write lock up front so two contexts cannot read
        // the same last id.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let last: Option<i64> = tx
            .query_row(
                "SELECT value FROM queue_meta WHERE key = ?1",
                params![LAST_ID_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let now = Utc::now();
        let id = next_record_id(id_from_sql(last.unwrap_or(0))?, &now);
        let key = id_to_sql(id)?;
        tx.execute(
            "INSERT INTO offline_requests(id, endpoint, data, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![key, draft.endpoint, data, format_timestamp(&now)],
        )?;
        tx.execute(
            "INSERT INTO queue_meta(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![LAST_ID_KEY, key],
        )?;
        tx.commit()?;

        Ok(id)
    }

    fn list_all(&self) -> PersistResult<Vec<QueueRecord>> {
        self.query_records(
            "SELECT id, endpoint, data, timestamp FROM offline_requests ORDER BY id ASC",
        )
    }

    fn list_by_timestamp(&self) -> PersistResult<Vec<QueueRecord>> {
        self.query_records(
            "SELECT id, endpoint, data, timestamp FROM offline_requests ORDER BY timestamp ASC, id ASC",
        )
    }

    fn delete_by_id(&mut self, id: RecordId) -> PersistResult<DeleteOutcome> {
        let key = id_to_sql(id)?;
        let count = self
            .conn
            .execute("DELETE FROM offline_requests WHERE id = ?1", params![key])?;
        Ok(if count == 0 {
            DeleteOutcome::NotFound
        } else {
            DeleteOutcome::Deleted
        })
    }

    fn len(&self) -> PersistResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM offline_requests", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| PersistError::Message(format!("invalid row count {count}")))
    }
}
