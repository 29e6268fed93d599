use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollcall_core::{Amount, EventId, UserId};
use rollcall_events::Command;

use crate::registry::EventDraft;
use crate::withdrawal::WithdrawalPolicy;

/// Command: CreateEvent.
///
/// `event_id` is allocated by the caller after `EventDraft::validate` passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEvent {
    pub event_id: EventId,
    pub organizer: UserId,
    pub draft: EventDraft,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Rsvp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rsvp {
    pub event_id: EventId,
    pub participant: UserId,
    pub value_sent: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CheckIn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub event_id: EventId,
    pub participant: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: WithdrawProceeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawProceeds {
    pub event_id: EventId,
    pub caller: UserId,
    pub policy: WithdrawalPolicy,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    CreateEvent(CreateEvent),
    Rsvp(Rsvp),
    CheckIn(CheckIn),
    WithdrawProceeds(WithdrawProceeds),
}

impl Command for LedgerCommand {
    fn target(&self) -> EventId {
        match self {
            LedgerCommand::CreateEvent(c) => c.event_id,
            LedgerCommand::Rsvp(c) => c.event_id,
            LedgerCommand::CheckIn(c) => c.event_id,
            LedgerCommand::WithdrawProceeds(c) => c.event_id,
        }
    }
}
