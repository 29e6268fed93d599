use std::collections::BTreeMap;
use std::sync::RwLock;

use rollcall_core::{EventId, ExpectedVersion};

use super::r#trait::{NotificationStore, StoreError, StoredNotification, UncommittedNotification};

/// In-memory append-only store.
///
/// Streams are kept in a `BTreeMap` so `load_all` is ordered by event id.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    streams: RwLock<BTreeMap<EventId, Vec<StoredNotification>>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredNotification]) -> u64 {
        stream.last().map(|n| n.sequence_number).unwrap_or(0)
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn append(
        &self,
        notifications: Vec<UncommittedNotification>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredNotification>, StoreError> {
        let Some(first) = notifications.first() else {
            return Ok(vec![]);
        };

        let aggregate_id = first.aggregate_id;
        let aggregate_type = first.aggregate_type.clone();

        for (idx, n) in notifications.iter().enumerate() {
            if n.aggregate_id != aggregate_id {
                return Err(StoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if n.aggregate_type != aggregate_type {
                return Err(StoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let mut streams = self.streams.write().map_err(|_| StoreError::Poisoned)?;

        let stream = streams.entry(aggregate_id).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "event {aggregate_id}: expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(StoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let mut next = current + 1;
        let mut committed = Vec::with_capacity(notifications.len());
        for n in notifications {
            let stored = StoredNotification {
                notification_id: n.notification_id,
                aggregate_id: n.aggregate_id,
                aggregate_type: n.aggregate_type,
                sequence_number: next,
                notification_type: n.notification_type,
                notification_version: n.notification_version,
                occurred_at: n.occurred_at,
                payload: n.payload,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: EventId) -> Result<Vec<StoredNotification>, StoreError> {
        let streams = self.streams.read().map_err(|_| StoreError::Poisoned)?;
        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    fn load_all(&self) -> Result<Vec<StoredNotification>, StoreError> {
        let streams = self.streams.read().map_err(|_| StoreError::Poisoned)?;
        Ok(streams.values().flatten().cloned().collect())
    }
}
