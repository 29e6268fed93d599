use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rollcall_core::EventId;

/// A notification plus its stream metadata.
///
/// - `aggregate_id` is the event stream the notification belongs to.
/// - `sequence_number` increases by one per stream, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<N> {
    notification_id: Uuid,

    aggregate_id: EventId,
    aggregate_type: String,

    sequence_number: u64,

    payload: N,
}

impl<N> Envelope<N> {
    pub fn new(
        notification_id: Uuid,
        aggregate_id: EventId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: N,
    ) -> Self {
        Self {
            notification_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn notification_id(&self) -> Uuid {
        self.notification_id
    }

    pub fn aggregate_id(&self) -> EventId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &N {
        &self.payload
    }

    pub fn into_payload(self) -> N {
        self.payload
    }
}

