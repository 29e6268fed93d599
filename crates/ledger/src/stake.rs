use serde::{Deserialize, Serialize};

use rollcall_core::{Amount, EventId, UserId, ValueObject};

/// Value custodied for one participant of one event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    /// Full amount sent with the RSVP (overpayment included).
    pub amount: Amount,
    /// Set by the RSVP, never cleared.
    pub attending: bool,
    /// Set by the first check-in; the stake has been released.
    pub checked_in: bool,
}

impl ValueObject for Stake {}

impl Stake {
    pub fn reserved(amount: Amount) -> Self {
        Self {
            amount,
            attending: true,
            checked_in: false,
        }
    }

    /// Whether the amount is still in custody (RSVP'd, not checked in).
    pub fn is_held(&self) -> bool {
        self.attending && !self.checked_in
    }
}

/// Key of a stake: one per (event, participant).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StakeKey {
    pub event_id: EventId,
    pub participant: UserId,
}

impl StakeKey {
    pub fn new(event_id: EventId, participant: UserId) -> Self {
        Self {
            event_id,
            participant,
        }
    }
}
