use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use rollcall_core::{EventId, ExpectedVersion};
use rollcall_events::{Envelope, Notification};
use std::sync::Arc;

/// A notification ready to be appended (no sequence number yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedNotification {
    pub notification_id: Uuid,
    pub aggregate_id: EventId,
    pub aggregate_type: String,

    pub notification_type: String,
    pub notification_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A committed notification with its position in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNotification {
    pub notification_id: Uuid,
    pub aggregate_id: EventId,
    pub aggregate_type: String,

    /// 1-based position in the event's stream.
    pub sequence_number: u64,

    pub notification_type: String,
    pub notification_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredNotification {
    /// Envelope for publication on the bus.
    pub fn to_envelope(&self) -> Envelope<JsonValue> {
        Envelope::new(
            self.notification_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Append-only store of per-event notification streams.
///
/// Implementations must:
/// - reject batches that mix streams
/// - enforce `expected_version` against the current stream length
/// - assign sequence numbers `current + 1, current + 2, ...`
/// - append a batch entirely or not at all
pub trait NotificationStore: Send + Sync {
    fn append(
        &self,
        notifications: Vec<UncommittedNotification>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredNotification>, StoreError>;

    /// Full stream in sequence order; empty when the event was never created.
    fn load_stream(&self, aggregate_id: EventId) -> Result<Vec<StoredNotification>, StoreError>;

    /// Every stream, ordered by event id then sequence number.
    fn load_all(&self) -> Result<Vec<StoredNotification>, StoreError>;
}

impl<S> NotificationStore for Arc<S>
where
    S: NotificationStore + ?Sized,
{
    fn append(
        &self,
        notifications: Vec<UncommittedNotification>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredNotification>, StoreError> {
        (**self).append(notifications, expected_version)
    }

    fn load_stream(&self, aggregate_id: EventId) -> Result<Vec<StoredNotification>, StoreError> {
        (**self).load_stream(aggregate_id)
    }

    fn load_all(&self) -> Result<Vec<StoredNotification>, StoreError> {
        (**self).load_all()
    }
}

impl UncommittedNotification {
    /// Serialize a typed notification, keeping the metadata needed to read it back.
    pub fn from_typed<N>(
        aggregate_id: EventId,
        aggregate_type: impl Into<String>,
        notification_id: Uuid,
        notification: &N,
    ) -> Result<Self, StoreError>
    where
        N: Notification + Serialize,
    {
        let payload = serde_json::to_value(notification)
            .map_err(|e| StoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            notification_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            notification_type: notification.notification_type().to_string(),
            notification_version: notification.version(),
            occurred_at: notification.occurred_at(),
            payload,
        })
    }
}
