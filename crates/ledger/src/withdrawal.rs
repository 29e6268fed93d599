//! Organizer withdrawal of forfeited stakes.
//!
//! The payout rule is an assumption: after the event has ended, the organizer
//! may collect, once, every stake whose participant never checked in.

use serde::{Deserialize, Serialize};

use crate::command::WithdrawProceeds;
use crate::error::LedgerError;
use crate::notification::{LedgerNotification, ProceedsWithdrawn};
use crate::record::EventRecord;

/// Whether organizers may withdraw no-show stakes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalPolicy {
    /// Every withdrawal fails with `WithdrawalsNotSupported`.
    Disabled,
    /// Forfeited stakes go to the organizer once the event has ended.
    #[default]
    ForfeitToOrganizer,
}

impl EventRecord {
    pub(crate) fn handle_withdraw(
        &self,
        cmd: &WithdrawProceeds,
    ) -> Result<Vec<LedgerNotification>, LedgerError> {
        self.ensure_event_id(cmd.event_id)?;
        let details = self.existing()?;

        if cmd.policy == WithdrawalPolicy::Disabled {
            return Err(LedgerError::WithdrawalsNotSupported);
        }
        if cmd.caller != details.organizer {
            return Err(LedgerError::NotOrganizer);
        }
        if !details.has_ended(cmd.occurred_at) {
            return Err(LedgerError::EventHasNotEnded);
        }
        if self.proceeds_withdrawn() {
            return Err(LedgerError::ProceedsAlreadyWithdrawn);
        }

        Ok(vec![LedgerNotification::ProceedsWithdrawn(ProceedsWithdrawn {
            event_id: cmd.event_id,
            organizer: details.organizer,
            amount: self.held_in_custody(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
