use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use rollcall_core::{Amount, EventId, UserId};
use rollcall_events::Envelope;
use rollcall_ledger::{AGGREGATE_TYPE, LedgerNotification, StakeKey};

use crate::notification_store::{NotificationStore, StoreError};
use crate::read_model::KeyedStore;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StakeStatus {
    /// In custody.
    Held,
    /// Released to the participant at check-in.
    Released,
    /// Paid to the organizer as a no-show stake.
    Forfeited,
}

/// Queryable custody read model: one row per stake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyEntry {
    pub event_id: EventId,
    pub participant: UserId,
    pub amount: Amount,
    pub status: StakeStatus,
}

#[derive(Debug, Error)]
pub enum CustodyProjectionError {
    #[error("failed to deserialize ledger notification: {0}")]
    Deserialize(String),

    #[error("notification for event {found} arrived on stream {stream}")]
    StreamMismatch { stream: EventId, found: EventId },

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Custody projection keyed by (event, participant).
///
/// Consumes published envelopes and tracks what is held, released and
/// forfeited per stake. Agrees with `EventRecord::held_in_custody` once it
/// has caught up with the store.
#[derive(Debug)]
pub struct CustodyProjection<S>
where
    S: KeyedStore<StakeKey, CustodyEntry>,
{
    store: S,
    cursors: RwLock<HashMap<EventId, u64>>,
}

impl<S> CustodyProjection<S>
where
    S: KeyedStore<StakeKey, CustodyEntry>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &StakeKey) -> Option<CustodyEntry> {
        self.store.get(key)
    }

    /// Stakes of one event, ordered by participant.
    pub fn list(&self, event_id: EventId) -> Vec<CustodyEntry> {
        self.store
            .list()
            .into_iter()
            .filter(|e| e.event_id == event_id)
            .collect()
    }

    /// Sum of stakes still held for an event.
    pub fn held_in_custody(&self, event_id: EventId) -> Amount {
        self.list(event_id)
            .iter()
            .filter(|e| e.status == StakeStatus::Held)
            .fold(Amount::ZERO, |acc, e| acc.saturating_add(e.amount))
    }

    /// Last applied sequence number of an event stream.
    pub fn position(&self, event_id: EventId) -> u64 {
        self.cursors
            .read()
            .ok()
            .and_then(|c| c.get(&event_id).copied())
            .unwrap_or(0)
    }

    /// Apply a published envelope.
    ///
    /// - Envelopes of other aggregate types are ignored.
    /// - Replays at or below the stream cursor are ignored.
    /// - A gap in the stream is an error; rebuild from the store to recover.
    pub fn apply_envelope(&self, envelope: &Envelope<JsonValue>) -> Result<(), CustodyProjectionError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }

        let stream = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let Ok(mut cursors) = self.cursors.write() else {
            return Ok(());
        };
        let last = cursors.get(&stream).copied().unwrap_or(0);

        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 {
            return Err(CustodyProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let notification: LedgerNotification = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| CustodyProjectionError::Deserialize(e.to_string()))?;

        if notification.event_id() != stream {
            return Err(CustodyProjectionError::StreamMismatch {
                stream,
                found: notification.event_id(),
            });
        }

        match notification {
            LedgerNotification::EventCreated(_) => {}
            LedgerNotification::AttendeeReplied(n) => {
                self.store.upsert(
                    StakeKey::new(n.event_id, n.participant),
                    CustodyEntry {
                        event_id: n.event_id,
                        participant: n.participant,
                        amount: n.stake,
                        status: StakeStatus::Held,
                    },
                );
            }
            LedgerNotification::ParticipantCheckedIn(n) => {
                let key = StakeKey::new(n.event_id, n.participant);
                let mut entry = self.store.get(&key).unwrap_or(CustodyEntry {
                    event_id: n.event_id,
                    participant: n.participant,
                    amount: n.released,
                    status: StakeStatus::Held,
                });
                entry.status = StakeStatus::Released;
                self.store.upsert(key, entry);
            }
            LedgerNotification::ProceedsWithdrawn(n) => {
                for mut entry in self.list(n.event_id) {
                    if entry.status == StakeStatus::Held {
                        entry.status = StakeStatus::Forfeited;
                        self.store
                            .upsert(StakeKey::new(entry.event_id, entry.participant), entry);
                    }
                }
            }
        }

        cursors.insert(stream, seq);
        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = Envelope<JsonValue>>,
    ) -> Result<(), CustodyProjectionError> {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.clear();
        }
        self.store.clear();

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (e.aggregate_id(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }

    /// Rebuild from every stream in a notification store.
    pub fn rebuild_from_store(&self, store: &impl NotificationStore) -> Result<(), CustodyProjectionError> {
        let stored = store.load_all()?;
        self.rebuild_from_scratch(stored.iter().map(|n| n.to_envelope()))
    }
}
