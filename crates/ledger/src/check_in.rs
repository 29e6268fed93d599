//! Check-in settlement: confirming attendance and releasing the stake.

use crate::command::CheckIn;
use crate::error::LedgerError;
use crate::notification::{LedgerNotification, ParticipantCheckedIn};
use crate::record::EventRecord;

impl EventRecord {
    /// Valid inside `[start_time, end_time]`, once per participant.
    ///
    /// The notification carries the full staked amount; paying it out is left
    /// to whoever commits the notification.
    pub(crate) fn handle_check_in(&self, cmd: &CheckIn) -> Result<Vec<LedgerNotification>, LedgerError> {
        self.ensure_event_id(cmd.event_id)?;
        let details = self.existing()?;

        if !details.has_started(cmd.occurred_at) {
            return Err(LedgerError::EventHasNotStarted);
        }
        if details.has_ended(cmd.occurred_at) {
            return Err(LedgerError::EventHasEnded);
        }

        let stake = self
            .stake(&cmd.participant)
            .filter(|stake| stake.attending)
            .ok_or(LedgerError::HasNotRsvpd)?;

        if stake.checked_in {
            return Err(LedgerError::AlreadyCheckedIn);
        }

        Ok(vec![LedgerNotification::ParticipantCheckedIn(ParticipantCheckedIn {
            event_id: cmd.event_id,
            participant: cmd.participant,
            released: stake.amount,
            occurred_at: cmd.occurred_at,
        })])
    }
}
