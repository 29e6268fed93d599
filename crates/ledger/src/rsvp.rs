//! Stake ledger: reserving a place, optionally backed by a stake.

use crate::command::Rsvp;
use crate::error::LedgerError;
use crate::notification::{AttendeeReplied, LedgerNotification};
use crate::record::EventRecord;

impl EventRecord {
    /// Overpayment is accepted and custodied in full; a no-show forfeits all of it.
    pub(crate) fn handle_rsvp(&self, cmd: &Rsvp) -> Result<Vec<LedgerNotification>, LedgerError> {
        self.ensure_event_id(cmd.event_id)?;
        let details = self.existing()?;

        if self
            .stake(&cmd.participant)
            .is_some_and(|stake| stake.attending)
        {
            return Err(LedgerError::AlreadyRsvpd);
        }

        if !details.is_free() {
            if cmd.value_sent.is_zero() {
                return Err(LedgerError::RsvpPriceMustBeSet);
            }
            if cmd.value_sent < details.rsvp_price {
                return Err(LedgerError::RsvpStakeMustBeAtLeast(details.rsvp_price));
            }
        }

        if details.is_full() {
            return Err(LedgerError::EventIsFull);
        }

        // A stake taken after the organizer collected could never be settled.
        if self.proceeds_withdrawn() {
            return Err(LedgerError::ProceedsAlreadyWithdrawn);
        }

        if self.held_in_custody().checked_add(cmd.value_sent).is_none() {
            return Err(LedgerError::StakeOverflow);
        }

        Ok(vec![LedgerNotification::AttendeeReplied(AttendeeReplied {
            event_id: cmd.event_id,
            participant: cmd.participant,
            stake: cmd.value_sent,
            occurred_at: cmd.occurred_at,
        })])
    }
}
