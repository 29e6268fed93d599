//! Scripted run of the ledger: two events, RSVPs, check-ins and a withdrawal,
//! driven by a manual clock.

use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Duration;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use rollcall_core::{Amount, Clock, ManualClock, UserId};
use rollcall_events::{Envelope, InMemoryBus};
use rollcall_infra::{
    CustodyEntry, CustodyProjection, EventLedger, InMemoryFunds, InMemoryKeyedStore,
    InMemoryNotificationStore, LedgerConfig, ProjectionWorker,
};
use rollcall_ledger::{EventDraft, StakeKey, WithdrawalPolicy};

#[derive(Debug)]
pub struct Summary {
    pub events: u64,
    pub paid_out: Amount,
    pub still_held: Amount,
}

/// Scripted run starting at `wall.now()`; the ledger then follows a manual clock.
pub fn run(config: LedgerConfig, wall: &impl Clock) -> anyhow::Result<Summary> {
    let clock = Arc::new(ManualClock::new(wall.now()));
    let funds = Arc::new(InMemoryFunds::new());
    let bus: Arc<InMemoryBus<Envelope<JsonValue>>> = Arc::new(InMemoryBus::new());
    let ledger = EventLedger::new(
        Arc::new(InMemoryNotificationStore::new()),
        bus.clone(),
        funds.clone(),
        clock.clone(),
        config,
    );

    let custody = Arc::new(CustodyProjection::new(InMemoryKeyedStore::<StakeKey, CustodyEntry>::new()));
    let sink = custody.clone();
    let worker = ProjectionWorker::spawn("custody-projection", &bus, move |env: Envelope<JsonValue>| {
        sink.apply_envelope(&env)
    })
    .context("failed to start the custody projection")?;

    let organizer = UserId::new();
    let (alice, bob, carol) = (UserId::new(), UserId::new(), UserId::new());

    let party = ledger.create_event(
        organizer,
        EventDraft {
            name: "basic party".to_string(),
            max_participants: 100,
            rsvp_price: Amount::ZERO,
            start_time: clock.now() + Duration::hours(1),
            duration_seconds: 3600,
        },
    )?;
    let dinner = ledger.create_event(
        organizer,
        EventDraft {
            name: "supper club".to_string(),
            max_participants: 2,
            rsvp_price: Amount::new(10),
            start_time: clock.now() + Duration::hours(1),
            duration_seconds: 3600,
        },
    )?;

    let meta = ledger.event_metadata(dinner)?;
    info!(event_id = %dinner, name = %meta.name, organizer = %meta.organizer, "registered");

    ledger.rsvp(alice, party, Amount::ZERO)?;
    ledger.rsvp(bob, dinner, Amount::new(12))?;
    ledger.rsvp(carol, dinner, Amount::new(10))?;

    match ledger.rsvp(alice, dinner, Amount::new(10)) {
        Err(e) => info!(event_id = %dinner, error = %e, "third dinner guest turned away"),
        Ok(()) => bail!("a full event accepted another RSVP"),
    }

    clock.advance(Duration::hours(2));
    ledger.check_in(alice, party)?;
    ledger.check_in(bob, dinner)?;

    clock.advance(Duration::seconds(1));
    match ledger.withdraw_proceeds(organizer, dinner) {
        Ok(amount) => info!(event_id = %dinner, amount = %amount, "organizer collected no-show stakes"),
        Err(e) if config.withdrawal_policy == WithdrawalPolicy::Disabled => {
            warn!(event_id = %dinner, error = %e, "withdrawals are disabled")
        }
        Err(e) => return Err(e.into()),
    }

    worker.shutdown();

    let still_held = ledger
        .event(party)?
        .held_in_custody
        .saturating_add(ledger.event(dinner)?.held_in_custody);
    if custody.held_in_custody(dinner) != ledger.event(dinner)?.held_in_custody {
        bail!("custody read model disagrees with the ledger");
    }

    Ok(Summary {
        events: ledger.next_event_id().map(|id| id.get() - 1).unwrap_or(u64::MAX),
        paid_out: funds.total_paid(),
        still_held,
    })
}
