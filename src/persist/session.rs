//! Key/value entry holding the signed-in user between restarts.

use std::{path::Path, sync::Arc};

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tokio::sync::Mutex;

use super::{PersistResult, sqlite::DEFAULT_BUSY_TIMEOUT};

const USER_KEY: &str = "user";

/// Session entry stored next to the queue in the same database file.
///
/// Nothing in the sync path reads it; it only restores who is signed in.
#[derive(Clone)]
pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SessionStore {
    /// Opens the session table in the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Private in-memory session store.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Replaces the stored user.
    pub async fn save_user(&self, user: &Value) -> PersistResult<()> {
        let value = serde_json::to_string(user)?;
        let conn_ref = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn_ref.blocking_lock();
            conn.execute(
                "INSERT INTO session(key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![USER_KEY, value],
            )?;
            PersistResult::Ok(())
        })
        .await?
    }

    /// Stored user, if any.
    pub async fn load_user(&self) -> PersistResult<Option<Value>> {
        let conn_ref = Arc::clone(&self.conn);
        let raw: Option<String> = tokio::task::spawn_blocking(move || {
            let conn = conn_ref.blocking_lock();
            conn.query_row(
                "SELECT value FROM session WHERE key = ?1",
                params![USER_KEY],
                |row| row.get(0),
            )
            .optional()
        })
        .await??;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Forgets the stored user.
    pub async fn clear_user(&self) -> PersistResult<()> {
        let conn_ref = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn_ref.blocking_lock();
            conn.execute("DELETE FROM session WHERE key = ?1", params![USER_KEY])?;
            PersistResult::Ok(())
        })
        .await?
    }
}
