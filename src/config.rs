//! Runtime configuration.

use std::{path::{Path, PathBuf}, time::Duration};

use serde::{Deserialize, Serialize};

use crate::types::{BACKGROUND_SYNC_TAG, STORE_NAME};

/// Error loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid config JSON.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Settings shared by the contexts and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Backend base URL; endpoints are appended to it.
    pub api_base_url: String,
    /// Database file shared by both contexts.
    pub store_path: PathBuf,
    /// Tag the worker answers to.
    pub background_sync_tag: String,
    /// Whether the platform offers background sync at all.
    pub background_sync_supported: bool,
    /// Bound of each context's command channel.
    pub command_queue_bound: usize,
    /// Buffered events per context before slow subscribers lag.
    pub event_capacity: usize,
    /// How long a context waits on a store locked by the other one.
    pub busy_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            store_path: PathBuf::from(format!("{STORE_NAME}.db")),
            background_sync_tag: BACKGROUND_SYNC_TAG.to_string(),
            background_sync_supported: true,
            command_queue_bound: 64,
            event_capacity: 256,
            busy_timeout_ms: 5_000,
        }
    }
}

impl SyncConfig {
    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// [`Self::busy_timeout_ms`] as a duration.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
