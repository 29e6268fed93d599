//! Event Ledger domain (event-sourced).
//!
//! Registry, stake ledger and check-in settlement for ticketed events,
//! implemented as deterministic domain logic over one aggregate per event.
//! No IO: time and caller identity arrive inside commands, and payouts are
//! reported in notifications for infrastructure to execute.

pub mod check_in;
pub mod command;
pub mod error;
pub mod notification;
pub mod record;
pub mod registry;
pub mod rsvp;
pub mod stake;
pub mod withdrawal;

#[cfg(test)]
mod testing;

pub use command::{CheckIn, CreateEvent, LedgerCommand, Rsvp, WithdrawProceeds};
pub use error::LedgerError;
pub use notification::{
    AttendeeReplied, EventCreated, LedgerNotification, ParticipantCheckedIn, ProceedsWithdrawn,
};
pub use record::{AGGREGATE_TYPE, EventDetails, EventRecord, EventSnapshot};
pub use registry::{EventDraft, EventMetadata};
pub use stake::{Stake, StakeKey};
pub use withdrawal::WithdrawalPolicy;
