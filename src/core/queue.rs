use chrono::Utc;
use hashbrown::HashMap;

use crate::{
    persist::{PersistResult, QueueStore},
    record::{QueueDraft, QueueRecord, next_record_id},
    types::{DeleteOutcome, RecordId},
};

/// How a [`MemoryQueue`] hands out ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// Wall-clock milliseconds, bumped past the last issued id.
    #[default]
    Clock,
    /// 1, 2, 3, ... regardless of time.
    Sequential,
}

/// Volatile queue store. Records vanish with the process.
///
/// Share one instance between contexts by cloning the
/// [`crate::persist::StoreHandle`] that wraps it.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    records: HashMap<RecordId, QueueRecord>,
    order: Vec<RecordId>,
    last_issued: RecordId,
    policy: IdPolicy,
}

impl MemoryQueue {
    /// Empty queue issuing clock-based ids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty queue issuing ids according to `policy`.
    pub fn with_policy(policy: IdPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}

impl QueueStore for MemoryQueue {
    fn add(&mut self, draft: QueueDraft) -> PersistResult<RecordId> {
        let now = Utc::now();
        let id = match self.policy {
            IdPolicy::Clock => next_record_id(self.last_issued, &now),
            IdPolicy::Sequential => self.last_issued + 1,
        };
        self.last_issued = id;

        self.order.push(id);
        self.records
            .insert(id, QueueRecord::from_draft(id, draft, now));
        Ok(id)
    }

    fn list_all(&self) -> PersistResult<Vec<QueueRecord>> {
        Ok(self
            .order
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect())
    }

    fn delete_by_id(&mut self, id: RecordId) -> PersistResult<DeleteOutcome> {
        if self.records.remove(&id).is_none() {
            return Ok(DeleteOutcome::NotFound);
        }
        // Ids are issued in increasing order, so `order` stays sorted.
        if let Ok(pos) = self.order.binary_search(&id) {
            self.order.remove(pos);
        }
        Ok(DeleteOutcome::Deleted)
    }

    fn len(&self) -> PersistResult<usize> {
        Ok(self.records.len())
    }
}
