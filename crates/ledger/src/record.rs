use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollcall_core::{Aggregate, AggregateRoot, Amount, EventId, UserId};

use crate::command::LedgerCommand;
use crate::error::LedgerError;
use crate::notification::LedgerNotification;
use crate::stake::Stake;

/// Stream type of every event record.
pub const AGGREGATE_TYPE: &str = "ledger.event";

/// The registered attributes of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    pub name: String,
    pub organizer: UserId,
    pub max_participants: u32,
    pub current_participants: u32,
    pub rsvp_price: Amount,
    pub start_time: DateTime<Utc>,
    /// `start_time + duration`, fixed at creation.
    pub end_time: DateTime<Utc>,
}

impl EventDetails {
    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }

    pub fn is_free(&self) -> bool {
        self.rsvp_price.is_zero()
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time
    }

    /// The end boundary itself is still inside the window.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }
}

/// Aggregate root: one registered event with its stakes.
///
/// A record that was never created has no details; there is no sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    id: EventId,
    details: Option<EventDetails>,
    stakes: BTreeMap<UserId, Stake>,
    held: Amount,
    proceeds_withdrawn: bool,
    version: u64,
}

/// Read-side copy of an event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub event_id: EventId,
    pub details: EventDetails,
    pub held_in_custody: Amount,
    pub proceeds_withdrawn: bool,
}

impl EventRecord {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: EventId) -> Self {
        Self {
            id,
            details: None,
            stakes: BTreeMap::new(),
            held: Amount::ZERO,
            proceeds_withdrawn: false,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> EventId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.details.is_some()
    }

    pub fn details(&self) -> Option<&EventDetails> {
        self.details.as_ref()
    }

    pub fn stake(&self, participant: &UserId) -> Option<&Stake> {
        self.stakes.get(participant)
    }

    pub fn stakes(&self) -> impl Iterator<Item = (&UserId, &Stake)> {
        self.stakes.iter()
    }

    /// Stakes of participants who RSVP'd and have not checked in, unless the
    /// organizer already withdrew them.
    pub fn held_in_custody(&self) -> Amount {
        self.held
    }

    pub fn proceeds_withdrawn(&self) -> bool {
        self.proceeds_withdrawn
    }

    pub fn snapshot(&self) -> Result<EventSnapshot, LedgerError> {
        let details = self.existing()?;
        Ok(EventSnapshot {
            event_id: self.id,
            details: details.clone(),
            held_in_custody: self.held,
            proceeds_withdrawn: self.proceeds_withdrawn,
        })
    }

    pub(crate) fn existing(&self) -> Result<&EventDetails, LedgerError> {
        self.details.as_ref().ok_or(LedgerError::EventDoesNotExist)
    }

    pub(crate) fn ensure_event_id(&self, event_id: EventId) -> Result<(), LedgerError> {
        if self.id != event_id {
            return Err(LedgerError::StreamMismatch {
                expected: self.id,
                found: event_id,
            });
        }
        Ok(())
    }
}

impl AggregateRoot for EventRecord {
    type Id = EventId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for EventRecord {
    type Command = LedgerCommand;
    type Notification = LedgerNotification;
    type Error = LedgerError;

    fn apply(&mut self, notification: &Self::Notification) {
        match notification {
            LedgerNotification::EventCreated(n) => {
                self.id = n.event_id;
                self.details = Some(EventDetails {
                    name: n.name.clone(),
                    organizer: n.organizer,
                    max_participants: n.max_participants,
                    current_participants: 0,
                    rsvp_price: n.rsvp_price,
                    start_time: n.start_time,
                    end_time: n.end_time,
                });
            }
            LedgerNotification::AttendeeReplied(n) => {
                if let Some(details) = self.details.as_mut() {
                    details.current_participants += 1;
                }
                self.stakes.insert(n.participant, Stake::reserved(n.stake));
                self.held = self.held.saturating_add(n.stake);
            }
            LedgerNotification::ParticipantCheckedIn(n) => {
                if let Some(stake) = self.stakes.get_mut(&n.participant) {
                    stake.checked_in = true;
                }
                self.held = self.held.saturating_sub(n.released);
            }
            LedgerNotification::ProceedsWithdrawn(n) => {
                self.proceeds_withdrawn = true;
                self.held = self.held.saturating_sub(n.amount);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Notification>, Self::Error> {
        match command {
            LedgerCommand::CreateEvent(cmd) => self.handle_create(cmd),
            LedgerCommand::Rsvp(cmd) => self.handle_rsvp(cmd),
            LedgerCommand::CheckIn(cmd) => self.handle_check_in(cmd),
            LedgerCommand::WithdrawProceeds(cmd) => self.handle_withdraw(cmd),
        }
    }
}
