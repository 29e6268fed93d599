use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollcall_core::{Amount, EventId, UserId};
use rollcall_events::Notification;

/// Notification: EventCreated (carries the full record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCreated {
    pub event_id: EventId,
    pub organizer: UserId,
    pub name: String,
    pub max_participants: u32,
    pub rsvp_price: Amount,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Notification: AttendeeReplied (the exact amount received).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeReplied {
    pub event_id: EventId,
    pub participant: UserId,
    pub stake: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Notification: ParticipantCheckedIn.
///
/// `released` is owed back to the participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantCheckedIn {
    pub event_id: EventId,
    pub participant: UserId,
    pub released: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Notification: ProceedsWithdrawn.
///
/// `amount` (the forfeited no-show stakes) is owed to the organizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProceedsWithdrawn {
    pub event_id: EventId,
    pub organizer: UserId,
    pub amount: Amount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerNotification {
    EventCreated(EventCreated),
    AttendeeReplied(AttendeeReplied),
    ParticipantCheckedIn(ParticipantCheckedIn),
    ProceedsWithdrawn(ProceedsWithdrawn),
}

impl LedgerNotification {
    pub fn event_id(&self) -> EventId {
        match self {
            LedgerNotification::EventCreated(n) => n.event_id,
            LedgerNotification::AttendeeReplied(n) => n.event_id,
            LedgerNotification::ParticipantCheckedIn(n) => n.event_id,
            LedgerNotification::ProceedsWithdrawn(n) => n.event_id,
        }
    }

    /// Value that leaves custody with this notification, and who receives it.
    pub fn payout(&self) -> Option<(UserId, Amount)> {
        match self {
            LedgerNotification::ParticipantCheckedIn(n) if !n.released.is_zero() => {
                Some((n.participant, n.released))
            }
            LedgerNotification::ProceedsWithdrawn(n) if !n.amount.is_zero() => {
                Some((n.organizer, n.amount))
            }
            _ => None,
        }
    }
}

impl Notification for LedgerNotification {
    fn notification_type(&self) -> &'static str {
        match self {
            LedgerNotification::EventCreated(_) => "ledger.event.created",
            LedgerNotification::AttendeeReplied(_) => "ledger.event.attendee_replied",
            LedgerNotification::ParticipantCheckedIn(_) => "ledger.event.participant_checked_in",
            LedgerNotification::ProceedsWithdrawn(_) => "ledger.event.proceeds_withdrawn",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerNotification::EventCreated(n) => n.occurred_at,
            LedgerNotification::AttendeeReplied(n) => n.occurred_at,
            LedgerNotification::ParticipantCheckedIn(n) => n.occurred_at,
            LedgerNotification::ProceedsWithdrawn(n) => n.occurred_at,
        }
    }
}
