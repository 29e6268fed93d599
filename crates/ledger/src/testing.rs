//! Shared fixtures for the domain tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use rollcall_core::{Amount, EventId, UserId};
use rollcall_events::execute;

use crate::command::{CreateEvent, LedgerCommand};
use crate::record::EventRecord;
use crate::registry::EventDraft;

/// Fixed "now" for deterministic schedules.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
}

/// One hour long, starting an hour after `t0`.
pub fn draft(max_participants: u32, price: u64) -> EventDraft {
    EventDraft {
        name: "basic party".to_string(),
        max_participants,
        rsvp_price: Amount::new(price),
        start_time: t0() + Duration::hours(1),
        duration_seconds: 3600,
    }
}

/// Event 1, created at `t0` by a fresh organizer.
pub fn created(draft: EventDraft) -> (EventRecord, UserId) {
    let organizer = UserId::new();
    let mut record = EventRecord::empty(EventId::FIRST);
    execute(
        &mut record,
        &LedgerCommand::CreateEvent(CreateEvent {
            event_id: EventId::FIRST,
            organizer,
            draft,
            occurred_at: t0(),
        }),
    )
    .expect("fixture event is valid");
    (record, organizer)
}
