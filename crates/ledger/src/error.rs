use rollcall_core::{Amount, EventId};
use thiserror::Error;

/// Every way a ledger command can be rejected.
///
/// All of these are detected before anything is recorded, so a rejected
/// command has no observable effect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("event must allow at least one participant")]
    EventMustAllowParticipants,

    #[error("event must have a non-zero duration")]
    EventMustHaveDuration,

    #[error("event must start in the future")]
    EventMustBeInFuture,

    #[error("event end time is out of range")]
    ScheduleOverflow,

    #[error("event {0} already exists")]
    EventAlreadyExists(EventId),

    #[error("event does not exist")]
    EventDoesNotExist,

    #[error("participant has already RSVP'd")]
    AlreadyRsvpd,

    #[error("event requires a stake to RSVP")]
    RsvpPriceMustBeSet,

    #[error("RSVP stake must be at least {0}")]
    RsvpStakeMustBeAtLeast(Amount),

    #[error("event is full")]
    EventIsFull,

    #[error("event has not started")]
    EventHasNotStarted,

    #[error("event has ended")]
    EventHasEnded,

    #[error("event has not ended")]
    EventHasNotEnded,

    #[error("participant has not RSVP'd")]
    HasNotRsvpd,

    #[error("participant has already checked in")]
    AlreadyCheckedIn,

    #[error("proceeds withdrawal is not supported")]
    WithdrawalsNotSupported,

    #[error("only the organizer may withdraw proceeds")]
    NotOrganizer,

    #[error("proceeds have already been withdrawn")]
    ProceedsAlreadyWithdrawn,

    #[error("stake total would overflow")]
    StakeOverflow,

    #[error("command for event {found} sent to event {expected}")]
    StreamMismatch { expected: EventId, found: EventId },
}
