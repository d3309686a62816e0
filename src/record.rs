//! Queue record and draft types plus id allocation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::RecordId;

/// A write that failed while offline, before it has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueDraft {
    /// Logical API path such as `/register`, relative to the API base.
    pub endpoint: String,
    /// Parsed request body.
    pub data: Value,
}

impl QueueDraft {
    /// Builds a draft for `endpoint` carrying `data`.
    pub fn new(endpoint: impl Into<String>, data: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            data,
        }
    }
}

/// Persisted representation of one failed write call, pending replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    /// Primary key, assigned once at creation.
    pub id: RecordId,
    /// Logical API path.
    pub endpoint: String,
    /// Parsed request body.
    pub data: Value,
    /// Creation time. Kept for inspection, never consulted for correctness.
    pub timestamp: DateTime<Utc>,
}

impl QueueRecord {
    /// Materializes `draft` with an allocated id and creation time.
    pub fn from_draft(id: RecordId, draft: QueueDraft, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            endpoint: draft.endpoint,
            data: draft.data,
            timestamp,
        }
    }

    /// ISO-8601 creation time with millisecond precision.
    pub fn timestamp_iso(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

/// Returns the next id given the last issued one and the current clock.
///
/// Ids follow wall-clock milliseconds but never go backwards and are never
/// reissued, even when the clock stalls or two writes land in the same
/// millisecond.
pub fn next_record_id(last_issued: RecordId, now: &DateTime<Utc>) -> RecordId {
    let now_ms = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    now_ms.max(last_issued.saturating_add(1))
}

/// Formats `ts` the way records are stored.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn ids_follow_the_clock_but_never_repeat() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(next_record_id(0, &now), 1_700_000_000_000);
        assert_eq!(next_record_id(1_700_000_000_000, &now), 1_700_000_000_001);
        assert_eq!(next_record_id(1_800_000_000_000, &now), 1_800_000_000_001);
    }

    #[test]
    fn timestamp_is_iso_with_millis() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(format_timestamp(&ts), "2023-11-14T22:13:20.123Z");
    }
}
