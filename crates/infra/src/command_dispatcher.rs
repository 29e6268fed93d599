//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the target stream
//!   ↓
//! 2. Rehydrate the aggregate (apply stored notifications in order)
//!   ↓
//! 3. Handle the command (pure decision, may reject)
//!   ↓
//! 4. Append to the store (optimistic concurrency on the stream revision)
//!   ↓
//! 5. Publish committed notifications to the bus
//! ```
//!
//! A rejected command stops at step 3: nothing is appended or published.
//! This module performs no IO itself; it composes the store and bus traits.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use rollcall_core::{Aggregate, EventId, ExpectedVersion};
use rollcall_events::{Command, Envelope, Notification, NotificationBus};

use crate::notification_store::{
    NotificationStore, StoreError, StoredNotification, UncommittedNotification,
};

#[derive(Debug, Error)]
pub enum DispatchError<E> {
    /// The aggregate rejected the command (deterministic, nothing recorded).
    #[error("command rejected: {0}")]
    Rejected(E),

    /// The stream moved between load and append.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    /// A stored payload could not be read back as the aggregate's notification type.
    #[error("failed to deserialize stored notification: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Store(StoreError),

    /// Publication failed after a successful append.
    #[error(transparent)]
    Publish(PublishError),
}

impl<E> From<StoreError> for DispatchError<E> {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl<E> From<PublishError> for DispatchError<E> {
    fn from(value: PublishError) -> Self {
        DispatchError::Publish(value)
    }
}

#[derive(Debug, Error)]
#[error("publication failed: {0}")]
pub struct PublishError(pub String);

/// Outcome of a committed command.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<N> {
    /// Typed notifications, in the order they were appended.
    pub notifications: Vec<N>,
    /// The same notifications as stored (with sequence numbers).
    pub stored: Vec<StoredNotification>,
}

impl<N> Committed<N> {
    /// Stream revision after the append.
    pub fn version(&self) -> u64 {
        self.stored.last().map(|s| s.sequence_number).unwrap_or(0)
    }
}

/// Reusable command execution engine.
///
/// - `S`: notification store (source of truth)
/// - `B`: bus receiving JSON envelopes after each append
///
/// Aggregates used here must be deterministic and side-effect free, and
/// must bump their version once per applied notification.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: NotificationStore,
    B: NotificationBus<Envelope<JsonValue>>,
{
    /// Rehydrate an aggregate from its stream without running a command.
    pub fn load<A>(
        &self,
        aggregate_id: EventId,
        make_aggregate: impl FnOnce(EventId) -> A,
    ) -> Result<A, DispatchError<A::Error>>
    where
        A: Aggregate<Id = EventId>,
        A::Notification: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    /// Steps 1-4: load, rehydrate, decide and append. Does not publish.
    ///
    /// Callers that need to act on the committed notifications before they
    /// are broadcast (e.g. to execute payouts) use this plus `publish`.
    pub fn commit<A>(
        &self,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(EventId) -> A,
    ) -> Result<Committed<A::Notification>, DispatchError<A::Error>>
    where
        A: Aggregate<Id = EventId>,
        A::Command: Command,
        A::Notification: Notification + Serialize + DeserializeOwned,
    {
        let aggregate_id = command.target();

        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history(&mut aggregate, &history)?;

        // 3) Decide (no mutation)
        let decided = aggregate.handle(&command).map_err(DispatchError::Rejected)?;
        if decided.is_empty() {
            return Ok(Committed {
                notifications: vec![],
                stored: vec![],
            });
        }

        // 4) Append
        let uncommitted = decided
            .iter()
            .map(|n| UncommittedNotification::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), n))
            .collect::<Result<Vec<_>, _>>()?;

        let stored = self.store.append(uncommitted, expected)?;

        Ok(Committed {
            notifications: decided,
            stored,
        })
    }

    /// Step 5: publish committed notifications, in order.
    pub fn publish(&self, stored: &[StoredNotification]) -> Result<(), PublishError> {
        for n in stored {
            self.bus
                .publish(n.to_envelope())
                .map_err(|e| PublishError(format!("{e:?}")))?;
        }
        Ok(())
    }

    /// The full pipeline: commit, then publish.
    pub fn dispatch<A>(
        &self,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(EventId) -> A,
    ) -> Result<Committed<A::Notification>, DispatchError<A::Error>>
    where
        A: Aggregate<Id = EventId>,
        A::Command: Command,
        A::Notification: Notification + Serialize + DeserializeOwned,
    {
        let committed = self.commit(aggregate_type, command, make_aggregate)?;
        self.publish(&committed.stored)?;
        Ok(committed)
    }
}

fn stream_version(stream: &[StoredNotification]) -> u64 {
    stream.last().map(|n| n.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream<E>(
    aggregate_id: EventId,
    stream: &[StoredNotification],
) -> Result<(), DispatchError<E>> {
    let mut last = 0u64;
    for (idx, n) in stream.iter().enumerate() {
        if n.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(StoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if n.sequence_number <= last {
            return Err(DispatchError::Store(StoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                n.sequence_number
            ))));
        }
        last = n.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(
    aggregate: &mut A,
    history: &[StoredNotification],
) -> Result<(), DispatchError<A::Error>>
where
    A: Aggregate,
    A::Notification: DeserializeOwned,
{
    for stored in history {
        let n: A::Notification = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&n);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use rollcall_core::{Amount, UserId};
    use rollcall_events::InMemoryBus;
    use rollcall_ledger::{
        AGGREGATE_TYPE, CreateEvent, EventDraft, EventRecord, LedgerCommand, LedgerError, Rsvp,
    };

    use super::*;
    use crate::notification_store::InMemoryNotificationStore;

    type Dispatcher = CommandDispatcher<
        Arc<InMemoryNotificationStore>,
        Arc<InMemoryBus<Envelope<JsonValue>>>,
    >;

    fn setup() -> Dispatcher {
        CommandDispatcher::new(Arc::new(InMemoryNotificationStore::new()), Arc::new(InMemoryBus::new()))
    }

    fn create_cmd() -> LedgerCommand {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        LedgerCommand::CreateEvent(CreateEvent {
            event_id: EventId::FIRST,
            organizer: UserId::new(),
            draft: EventDraft {
                name: "launch".to_string(),
                max_participants: 2,
                rsvp_price: Amount::ZERO,
                start_time: now + Duration::hours(1),
                duration_seconds: 60,
            },
            occurred_at: now,
        })
    }

    #[test]
    fn dispatch_appends_then_publishes() {
        let dispatcher = setup();
        let sub = dispatcher.bus().subscribe();

        let committed = dispatcher
            .dispatch(AGGREGATE_TYPE, create_cmd(), EventRecord::empty)
            .unwrap();

        assert_eq!(committed.version(), 1);
        assert_eq!(committed.stored[0].notification_type, "ledger.event.created");

        let published = sub.drain();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].aggregate_id(), EventId::FIRST);
        assert_eq!(published[0].sequence_number(), 1);
    }

    #[test]
    fn rejected_commands_leave_no_trace() {
        let dispatcher = setup();
        let sub = dispatcher.bus().subscribe();

        let err = dispatcher
            .dispatch(
                AGGREGATE_TYPE,
                LedgerCommand::Rsvp(Rsvp {
                    event_id: EventId::FIRST,
                    participant: UserId::new(),
                    value_sent: Amount::ZERO,
                    occurred_at: Utc::now(),
                }),
                EventRecord::empty,
            )
            .unwrap_err();

        assert!(matches!(err, DispatchError::Rejected(LedgerError::EventDoesNotExist)));
        assert!(dispatcher.store().load_all().unwrap().is_empty());
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn load_rehydrates_from_the_store() {
        let dispatcher = setup();
        dispatcher
            .dispatch(AGGREGATE_TYPE, create_cmd(), EventRecord::empty)
            .unwrap();

        let record = dispatcher.load(EventId::FIRST, EventRecord::empty).unwrap();
        assert_eq!(record.metadata().unwrap().name, "launch");

        let missing = dispatcher
            .load(EventId::new(2).unwrap(), EventRecord::empty)
            .unwrap();
        assert!(!missing.exists());
    }

    #[test]
    fn corrupt_payloads_surface_as_deserialize_errors() {
        let dispatcher = setup();
        dispatcher
            .store()
            .append(
                vec![UncommittedNotification {
                    notification_id: Uuid::now_v7(),
                    aggregate_id: EventId::FIRST,
                    aggregate_type: AGGREGATE_TYPE.to_string(),
                    notification_type: "ledger.event.created".to_string(),
                    notification_version: 1,
                    occurred_at: Utc::now(),
                    payload: serde_json::json!({ "unexpected": true }),
                }],
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        let err = dispatcher.load(EventId::FIRST, EventRecord::empty).unwrap_err();
        assert!(matches!(err, DispatchError::Deserialize(_)));
    }
}
