//! Registry: creating and reading event records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use rollcall_core::{Amount, UserId};

use crate::command::CreateEvent;
use crate::error::LedgerError;
use crate::notification::{EventCreated, LedgerNotification};
use crate::record::EventRecord;

/// Attributes supplied by an organizer to register an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub name: String,
    pub max_participants: u32,
    pub rsvp_price: Amount,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: u64,
}

impl EventDraft {
    /// Validate the draft against the current time and derive its end time.
    ///
    /// Depends only on the draft, so callers run it before allocating an id:
    /// a rejected draft never consumes one.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, LedgerError> {
        if self.max_participants == 0 {
            return Err(LedgerError::EventMustAllowParticipants);
        }
        if self.duration_seconds == 0 {
            return Err(LedgerError::EventMustHaveDuration);
        }
        if self.start_time < now {
            return Err(LedgerError::EventMustBeInFuture);
        }

        let seconds = i64::try_from(self.duration_seconds).map_err(|_| LedgerError::ScheduleOverflow)?;
        let duration = Duration::try_seconds(seconds).ok_or(LedgerError::ScheduleOverflow)?;
        self.start_time
            .checked_add_signed(duration)
            .ok_or(LedgerError::ScheduleOverflow)
    }
}

/// Public metadata of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub name: String,
    pub organizer: UserId,
}

impl EventRecord {
    pub fn metadata(&self) -> Result<EventMetadata, LedgerError> {
        let details = self.existing()?;
        Ok(EventMetadata {
            name: details.name.clone(),
            organizer: details.organizer,
        })
    }

    pub(crate) fn handle_create(&self, cmd: &CreateEvent) -> Result<Vec<LedgerNotification>, LedgerError> {
        if self.exists() {
            return Err(LedgerError::EventAlreadyExists(self.id_typed()));
        }
        self.ensure_event_id(cmd.event_id)?;

        let end_time = cmd.draft.validate(cmd.occurred_at)?;

        Ok(vec![LedgerNotification::EventCreated(EventCreated {
            event_id: cmd.event_id,
            organizer: cmd.organizer,
            name: cmd.draft.name.clone(),
            max_participants: cmd.draft.max_participants,
            rsvp_price: cmd.draft.rsvp_price,
            start_time: cmd.draft.start_time,
            end_time,
            occurred_at: cmd.occurred_at,
        })])
    }
}
