//! Request capture: issues writes and queues the ones that fail offline.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    connectivity::Connectivity,
    persist::{PersistError, StoreHandle},
    record::QueueDraft,
    transport::{HttpRequest, HttpResponse, Transport, TransportError},
    types::RecordId,
};

const FALLBACK_ERROR_MESSAGE: &str = "request failed";

/// Result of a captured write that did not error.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The backend accepted the write; carries its decoded response.
    Delivered(Value),
    /// The write was stored locally and will be replayed later.
    Queued {
        /// Id of the stored record.
        id: RecordId,
    },
}

impl WriteOutcome {
    /// True when the write went to the queue.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

/// Error surfaced to the caller of a captured call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response while online; nothing was queued.
    #[error("network error: {0}")]
    Network(#[from] TransportError),
    /// The backend answered with a non-2xx status.
    #[error("request rejected with status {status}: {message}")]
    Application {
        /// HTTP status.
        status: u16,
        /// `message` from the body, or a generic fallback.
        message: String,
    },
    /// A response or request body was not the expected JSON.
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    /// Offline and the local store could not keep the write either.
    #[error("offline and the write could not be queued: {source}")]
    NotDurablyQueued {
        /// Why the store refused the record.
        #[source]
        source: PersistError,
        /// The network failure that led to queuing.
        network: TransportError,
    },
}

/// Wraps outbound calls for one execution context.
///
/// Constructed once by the application and shared by reference or clone.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: StoreHandle,
    connectivity: Connectivity,
}

impl ApiClient {
    /// Binds a transport, a queue store and the connectivity flag.
    pub fn new(transport: Arc<dyn Transport>, store: StoreHandle, connectivity: Connectivity) -> Self {
        Self {
            transport,
            store,
            connectivity,
        }
    }

    /// Store failed writes go to.
    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Connectivity flag consulted on failure.
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Issues a write to `endpoint`, queuing it if the network is
    /// unreachable while the device is known to be offline.
    pub async fn write(&self, endpoint: &str, payload: Value) -> Result<WriteOutcome, ApiError> {
        let request = HttpRequest::post_json(endpoint, payload.clone());
        match self.transport.send(request).await {
            Ok(response) => Ok(WriteOutcome::Delivered(decode_success(response)?)),
            Err(err) if !self.connectivity.is_online() => {
                tracing::warn!(endpoint, error = %err, "write failed while offline, queuing");
                match self.store.add(QueueDraft::new(endpoint, payload)).await {
                    Ok(id) => {
                        tracing::info!(endpoint, id, "write queued for later sync");
                        Ok(WriteOutcome::Queued { id })
                    }
                    Err(source) => {
                        tracing::error!(endpoint, error = %source, "failed to queue offline write");
                        Err(ApiError::NotDurablyQueued {
                            source,
                            network: err,
                        })
                    }
                }
            }
            Err(err) => {
                tracing::error!(endpoint, error = %err, "write failed while online");
                Err(ApiError::Network(err))
            }
        }
    }

    /// Issues a read. Reads are never queued.
    pub async fn fetch(&self, path: &str) -> Result<Value, ApiError> {
        let response = self.transport.send(HttpRequest::get(path)).await?;
        decode_success(response)
    }

    /// Issues a write that is never queued, whatever the connectivity.
    pub async fn post_direct(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        let response = self
            .transport
            .send(HttpRequest::post_json(path, body))
            .await?;
        decode_success(response)
    }
}

fn decode_success(response: HttpResponse) -> Result<Value, ApiError> {
    if response.is_success() {
        return Ok(response.json_body()?);
    }

    let message = response
        .json_body()
        .ok()
        .and_then(|body| {
            body.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
    Err(ApiError::Application {
        status: response.status,
        message,
    })
}
