//! Replay of queued writes.

use serde::{Deserialize, Serialize};

use crate::{
    persist::{PersistResult, StoreHandle},
    record::QueueRecord,
    transport::{HttpRequest, Transport},
    types::{DeleteOutcome, RecordId},
};

/// Header carrying the record id so the backend can drop duplicates.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Outcome of one replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Records read at the start of the pass.
    pub attempted: usize,
    /// Accepted by the backend and removed from the store.
    pub delivered: Vec<RecordId>,
    /// Still queued after the pass.
    pub retained: Vec<RecordId>,
    /// Accepted by the backend but already deleted by another context.
    pub already_removed: Vec<RecordId>,
}

impl ReplayReport {
    /// True when nothing was left behind.
    pub fn is_clean(&self) -> bool {
        self.retained.is_empty()
    }
}

enum RecordOutcome {
    Delivered,
    AlreadyRemoved,
    Retained,
}

/// Runs one pass over every queued record.
///
/// Records are sent one at a time in the order the store lists them. A record
/// is deleted only after a 2xx; any other outcome leaves it queued and the pass
/// moves on. Only a failure to read the queue fails the pass.
pub async fn replay_pass(store: &StoreHandle, transport: &dyn Transport) -> PersistResult<ReplayReport> {
    let records = store.list_all().await?;
    let mut report = ReplayReport {
        attempted: records.len(),
        ..ReplayReport::default()
    };

    if records.is_empty() {
        tracing::debug!("replay pass found nothing queued");
        return Ok(report);
    }
    tracing::info!(count = records.len(), "replay pass starting");

    for record in records {
        let id = record.id;
        match replay_record(store, transport, record).await {
            RecordOutcome::Delivered => report.delivered.push(id),
            RecordOutcome::AlreadyRemoved => report.already_removed.push(id),
            RecordOutcome::Retained => report.retained.push(id),
        }
    }

    tracing::info!(
        delivered = report.delivered.len(),
        already_removed = report.already_removed.len(),
        retained = report.retained.len(),
        "replay pass completed"
    );
    Ok(report)
}

async fn replay_record(store: &StoreHandle, transport: &dyn Transport, record: QueueRecord) -> RecordOutcome {
    let id = record.id;
    let request = HttpRequest::post_json(record.endpoint.clone(), record.data)
        .header(IDEMPOTENCY_HEADER, id.to_string());

    tracing::debug!(id, endpoint = %record.endpoint, "replaying record");
    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(id, endpoint = %record.endpoint, error = %err, "replay request failed");
            return RecordOutcome::Retained;
        }
    };

    if !response.is_success() {
        tracing::warn!(
            id,
            endpoint = %record.endpoint,
            status = response.status,
            body = %response.text(),
            "replay rejected"
        );
        return RecordOutcome::Retained;
    }

    match store.delete_by_id(id).await {
        Ok(DeleteOutcome::Deleted) => {
            tracing::debug!(id, "replayed record removed");
            RecordOutcome::Delivered
        }
        Ok(DeleteOutcome::NotFound) => {
            tracing::debug!(id, "replayed record was already removed");
            RecordOutcome::AlreadyRemoved
        }
        Err(err) => {
            // Delivered but still stored; the next pass will send it again.
            tracing::warn!(id, error = %err, "failed to remove replayed record");
            RecordOutcome::Retained
        }
    }
}
