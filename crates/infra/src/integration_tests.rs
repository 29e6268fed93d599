//! End-to-end tests of the ledger service.
//!
//! Service → NotificationStore → Bus → Custody projection, with a manual
//! clock and in-memory funds.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::Value as JsonValue;

    use rollcall_core::{Amount, Clock, EventId, ManualClock, UserId};
    use rollcall_events::{Envelope, InMemoryBus};
    use rollcall_ledger::{
        AttendeeReplied, EventDraft, LedgerError, LedgerNotification, ParticipantCheckedIn,
        StakeKey, WithdrawalPolicy,
    };

    use crate::config::LedgerConfig;
    use crate::funds::InMemoryFunds;
    use crate::ledger::{EventLedger, ServiceError};
    use crate::notification_store::{InMemoryNotificationStore, NotificationStore};
    use crate::projections::{CustodyEntry, CustodyProjection, StakeStatus};
    use crate::read_model::InMemoryKeyedStore;
    use crate::workers::ProjectionWorker;

    type Bus = Arc<InMemoryBus<Envelope<JsonValue>>>;
    type Ledger = EventLedger<Arc<InMemoryNotificationStore>, Bus, Arc<InMemoryFunds>, Arc<ManualClock>>;
    type Custody = CustodyProjection<Arc<InMemoryKeyedStore<StakeKey, CustodyEntry>>>;

    struct Harness {
        ledger: Ledger,
        bus: Bus,
        clock: Arc<ManualClock>,
        funds: Arc<InMemoryFunds>,
    }

    fn harness_with(policy: WithdrawalPolicy) -> Harness {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()));
        let funds = Arc::new(InMemoryFunds::new());
        let bus: Bus = Arc::new(InMemoryBus::new());
        let ledger = EventLedger::new(
            Arc::new(InMemoryNotificationStore::new()),
            bus.clone(),
            funds.clone(),
            clock.clone(),
            LedgerConfig {
                withdrawal_policy: policy,
            },
        );
        Harness {
            ledger,
            bus,
            clock,
            funds,
        }
    }

    fn harness() -> Harness {
        harness_with(WithdrawalPolicy::default())
    }

    impl Harness {
        fn draft(&self, max: u32, price: u64, duration_seconds: u64) -> EventDraft {
            EventDraft {
                name: "basic party".to_string(),
                max_participants: max,
                rsvp_price: Amount::new(price),
                start_time: self.clock.now() + Duration::hours(1),
                duration_seconds,
            }
        }

        fn create(&self, max: u32, price: u64) -> (EventId, UserId) {
            let organizer = UserId::new();
            let id = self
                .ledger
                .create_event(organizer, self.draft(max, price, 3600))
                .unwrap();
            (id, organizer)
        }
    }

    fn rejection(result: Result<impl core::fmt::Debug, ServiceError>) -> LedgerError {
        match result {
            Err(ServiceError::Rejected(e)) => e,
            other => panic!("expected a domain rejection, got {other:?}"),
        }
    }

    fn decode(envelopes: Vec<Envelope<JsonValue>>) -> Vec<LedgerNotification> {
        envelopes
            .into_iter()
            .map(|e| serde_json::from_value(e.into_payload()).unwrap())
            .collect()
    }

    fn custody() -> Custody {
        CustodyProjection::new(Arc::new(InMemoryKeyedStore::new()))
    }

    #[test]
    fn basic_party_free_rsvp_and_check_in_at_end_boundary() {
        let h = harness();
        let sub = h.ledger.subscribe();
        let alice = UserId::new();
        let organizer = UserId::new();

        let id = h.ledger.create_event(organizer, h.draft(100, 0, 3600)).unwrap();
        assert_eq!(id, EventId::FIRST);

        h.ledger.rsvp(alice, id, Amount::ZERO).unwrap();

        // now + 2h is exactly the end time, which is still inside the window.
        h.clock.advance(Duration::hours(2));
        assert_eq!(h.ledger.check_in(alice, id).unwrap(), Amount::ZERO);

        let published = decode(sub.drain());
        assert_eq!(published.len(), 3);
        assert!(matches!(
            &published[1],
            LedgerNotification::AttendeeReplied(AttendeeReplied { event_id, participant, stake, .. })
                if *event_id == id && *participant == alice && stake.is_zero()
        ));
        assert!(matches!(
            &published[2],
            LedgerNotification::ParticipantCheckedIn(ParticipantCheckedIn { event_id, participant, released, .. })
                if *event_id == id && *participant == alice && released.is_zero()
        ));

        // Zero releases move no funds.
        assert!(h.funds.payouts().is_empty());

        let snapshot = h.ledger.event(id).unwrap();
        assert_eq!(snapshot.details.current_participants, 1);
        assert_eq!(snapshot.details.end_time, snapshot.details.start_time + Duration::hours(1));
    }

    #[test]
    fn overpayment_is_kept_and_released_in_full() {
        let h = harness();
        let bob = UserId::new();
        let id = h
            .ledger
            .create_event(UserId::new(), h.draft(1, 1, 86_400))
            .unwrap();

        h.ledger.rsvp(bob, id, Amount::new(2)).unwrap();
        assert_eq!(h.ledger.event(id).unwrap().held_in_custody, Amount::new(2));

        h.clock.advance(Duration::hours(2));
        assert_eq!(h.ledger.check_in(bob, id).unwrap(), Amount::new(2));
        assert_eq!(h.funds.balance(&bob), Amount::new(2));
        assert_eq!(h.ledger.event(id).unwrap().held_in_custody, Amount::ZERO);
    }

    #[test]
    fn rejected_creates_leave_the_next_id_unchanged() {
        let h = harness();
        let organizer = UserId::new();

        assert_eq!(
            rejection(h.ledger.create_event(organizer, h.draft(0, 0, 3600))),
            LedgerError::EventMustAllowParticipants
        );
        assert_eq!(
            rejection(h.ledger.create_event(organizer, h.draft(5, 0, 0))),
            LedgerError::EventMustHaveDuration
        );
        let mut past = h.draft(5, 0, 3600);
        past.start_time = h.clock.now() - Duration::seconds(1);
        assert_eq!(
            rejection(h.ledger.create_event(organizer, past)),
            LedgerError::EventMustBeInFuture
        );
        assert_eq!(
            rejection(h.ledger.create_event(organizer, h.draft(5, 0, u64::MAX))),
            LedgerError::ScheduleOverflow
        );

        assert_eq!(h.ledger.next_event_id(), Some(EventId::FIRST));
        let (first, _) = h.create(5, 0);
        let (second, _) = h.create(5, 0);
        assert_eq!((first.get(), second.get()), (1, 2));
        assert!(h.ledger.store().load_stream(EventId::new(3).unwrap()).unwrap().is_empty());
    }

    #[test]
    fn starting_now_is_allowed() {
        let h = harness();
        let mut draft = h.draft(5, 0, 60);
        draft.start_time = h.clock.now();
        assert!(h.ledger.create_event(UserId::new(), draft).is_ok());
    }

    #[test]
    fn metadata_reports_name_and_organizer() {
        let h = harness();
        let (id, organizer) = h.create(10, 0);

        let meta = h.ledger.event_metadata(id).unwrap();
        assert_eq!(meta.name, "basic party");
        assert_eq!(meta.organizer, organizer);
        assert_eq!(
            rejection(h.ledger.event_metadata(EventId::new(2).unwrap())),
            LedgerError::EventDoesNotExist
        );
    }

    #[test]
    fn double_rsvp_is_rejected_without_changes() {
        let h = harness();
        let (id, _) = h.create(10, 3);
        let carol = UserId::new();

        h.ledger.rsvp(carol, id, Amount::new(3)).unwrap();
        let before = h.ledger.event(id).unwrap();
        let stream_len = h.ledger.store().load_stream(id).unwrap().len();

        assert_eq!(
            rejection(h.ledger.rsvp(carol, id, Amount::new(3))),
            LedgerError::AlreadyRsvpd
        );
        assert_eq!(h.ledger.event(id).unwrap(), before);
        assert_eq!(h.ledger.store().load_stream(id).unwrap().len(), stream_len);
    }

    #[test]
    fn paid_events_require_the_price() {
        let h = harness();
        let (id, _) = h.create(10, 5);

        assert_eq!(
            rejection(h.ledger.rsvp(UserId::new(), id, Amount::ZERO)),
            LedgerError::RsvpPriceMustBeSet
        );
        assert_eq!(
            rejection(h.ledger.rsvp(UserId::new(), id, Amount::new(4))),
            LedgerError::RsvpStakeMustBeAtLeast(Amount::new(5))
        );

        h.ledger.rsvp(UserId::new(), id, Amount::new(5)).unwrap();
        h.ledger.rsvp(UserId::new(), id, Amount::new(9)).unwrap();
        assert_eq!(h.ledger.event(id).unwrap().held_in_custody, Amount::new(14));
    }

    #[test]
    fn full_events_turn_people_away() {
        let h = harness();
        let (id, _) = h.create(1, 0);

        h.ledger.rsvp(UserId::new(), id, Amount::ZERO).unwrap();
        assert_eq!(
            rejection(h.ledger.rsvp(UserId::new(), id, Amount::ZERO)),
            LedgerError::EventIsFull
        );
        assert_eq!(h.ledger.event(id).unwrap().details.current_participants, 1);
    }

    #[test]
    fn late_rsvp_stakes_go_to_the_organizer() {
        let h = harness();
        let (id, organizer) = h.create(10, 3);

        h.clock.advance(Duration::hours(2) + Duration::seconds(1));
        h.ledger.rsvp(UserId::new(), id, Amount::new(3)).unwrap();
        assert_eq!(h.ledger.withdraw_proceeds(organizer, id).unwrap(), Amount::new(3));

        assert_eq!(
            rejection(h.ledger.rsvp(UserId::new(), id, Amount::new(3))),
            LedgerError::ProceedsAlreadyWithdrawn
        );
        let snapshot = h.ledger.event(id).unwrap();
        assert_eq!(snapshot.details.current_participants, 1);
        assert_eq!(snapshot.held_in_custody, Amount::ZERO);
        assert_eq!(h.funds.balance(&organizer), Amount::new(3));
    }

    #[test]
    fn check_in_is_bounded_by_the_window() {
        let h = harness();
        let (id, _) = h.create(10, 0);
        let (early, late, stranger) = (UserId::new(), UserId::new(), UserId::new());
        h.ledger.rsvp(early, id, Amount::ZERO).unwrap();
        h.ledger.rsvp(late, id, Amount::ZERO).unwrap();

        assert_eq!(rejection(h.ledger.check_in(early, id)), LedgerError::EventHasNotStarted);

        h.clock.advance(Duration::hours(1));
        assert_eq!(rejection(h.ledger.check_in(stranger, id)), LedgerError::HasNotRsvpd);
        h.ledger.check_in(early, id).unwrap();

        h.clock.advance(Duration::hours(1) + Duration::seconds(1));
        assert_eq!(rejection(h.ledger.check_in(late, id)), LedgerError::EventHasEnded);
    }

    #[test]
    fn repeat_check_in_pays_nothing() {
        let h = harness();
        let (id, _) = h.create(10, 4);
        let dave = UserId::new();
        h.ledger.rsvp(dave, id, Amount::new(4)).unwrap();

        h.clock.advance(Duration::minutes(90));
        assert_eq!(h.ledger.check_in(dave, id).unwrap(), Amount::new(4));
        assert_eq!(rejection(h.ledger.check_in(dave, id)), LedgerError::AlreadyCheckedIn);

        assert_eq!(h.funds.payouts().len(), 1);
        assert_eq!(h.funds.balance(&dave), Amount::new(4));
    }

    #[test]
    fn organizer_collects_no_show_stakes_once() {
        let h = harness();
        let (id, organizer) = h.create(10, 2);
        let (came, skipped_a, skipped_b) = (UserId::new(), UserId::new(), UserId::new());
        h.ledger.rsvp(came, id, Amount::new(2)).unwrap();
        h.ledger.rsvp(skipped_a, id, Amount::new(3)).unwrap();
        h.ledger.rsvp(skipped_b, id, Amount::new(4)).unwrap();

        h.clock.advance(Duration::minutes(90));
        h.ledger.check_in(came, id).unwrap();

        assert_eq!(
            rejection(h.ledger.withdraw_proceeds(organizer, id)),
            LedgerError::EventHasNotEnded
        );

        h.clock.advance(Duration::hours(1));
        assert_eq!(
            rejection(h.ledger.withdraw_proceeds(came, id)),
            LedgerError::NotOrganizer
        );
        assert_eq!(h.ledger.withdraw_proceeds(organizer, id).unwrap(), Amount::new(7));
        assert_eq!(
            rejection(h.ledger.withdraw_proceeds(organizer, id)),
            LedgerError::ProceedsAlreadyWithdrawn
        );

        assert_eq!(h.funds.balance(&organizer), Amount::new(7));
        assert_eq!(h.funds.total_paid(), Amount::new(9));
        let snapshot = h.ledger.event(id).unwrap();
        assert!(snapshot.proceeds_withdrawn);
        assert_eq!(snapshot.held_in_custody, Amount::ZERO);
    }

    #[test]
    fn withdrawing_nothing_succeeds_without_a_payout() {
        let h = harness();
        let (id, organizer) = h.create(10, 0);

        h.clock.advance(Duration::hours(3));
        assert_eq!(h.ledger.withdraw_proceeds(organizer, id).unwrap(), Amount::ZERO);
        assert!(h.funds.payouts().is_empty());
    }

    #[test]
    fn disabled_policy_rejects_every_withdrawal_after_existence() {
        let h = harness_with(WithdrawalPolicy::Disabled);
        let (id, organizer) = h.create(10, 0);

        assert_eq!(
            rejection(h.ledger.withdraw_proceeds(organizer, EventId::new(9).unwrap())),
            LedgerError::EventDoesNotExist
        );
        assert_eq!(
            rejection(h.ledger.withdraw_proceeds(UserId::new(), id)),
            LedgerError::WithdrawalsNotSupported
        );
    }

    #[test]
    fn concurrent_rsvps_never_exceed_capacity() {
        let h = Arc::new(harness());
        let (id, _) = h.create(10, 1);

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let h = h.clone();
                std::thread::spawn(move || h.ledger.rsvp(UserId::new(), id, Amount::new(1)))
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(()) => accepted += 1,
                Err(e) => assert_eq!(e.rejection(), Some(&LedgerError::EventIsFull)),
            }
        }

        assert_eq!(accepted, 10);
        let snapshot = h.ledger.event(id).unwrap();
        assert_eq!(snapshot.details.current_participants, 10);
        assert_eq!(snapshot.held_in_custody, Amount::new(10));
    }

    #[test]
    fn custody_projection_follows_the_bus_and_rebuilds_from_the_store() {
        let h = harness();
        let live = Arc::new(custody());
        let sink = live.clone();
        let worker = ProjectionWorker::spawn("custody", &h.bus, move |env: Envelope<JsonValue>| {
            sink.apply_envelope(&env)
        })
        .unwrap();

        let (id, organizer) = h.create(10, 1);
        let people: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
        for (i, p) in people.iter().enumerate() {
            h.ledger.rsvp(*p, id, Amount::new(i as u64 + 1)).unwrap();
        }
        h.clock.advance(Duration::minutes(90));
        h.ledger.check_in(people[3], id).unwrap();

        worker.shutdown();
        assert_eq!(live.held_in_custody(id), h.ledger.event(id).unwrap().held_in_custody);
        assert_eq!(live.held_in_custody(id), Amount::new(6));

        h.clock.advance(Duration::hours(1));
        h.ledger.withdraw_proceeds(organizer, id).unwrap();

        let rebuilt = custody();
        rebuilt.rebuild_from_store(h.ledger.store()).unwrap();
        assert_eq!(rebuilt.held_in_custody(id), Amount::ZERO);

        let statuses: Vec<_> = rebuilt.list(id).into_iter().map(|e| e.status).collect();
        assert_eq!(statuses.iter().filter(|s| **s == StakeStatus::Forfeited).count(), 3);
        assert_eq!(statuses.iter().filter(|s| **s == StakeStatus::Released).count(), 1);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Rsvp(usize, u64),
        CheckIn(usize),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0usize..6, 0u64..50).prop_map(|(p, v)| Step::Rsvp(p, v)),
            (0usize..6).prop_map(Step::CheckIn),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn custody_read_model_agrees_with_the_ledger(
            before in proptest::collection::vec(step(), 0..20),
            during in proptest::collection::vec(step(), 0..20),
        ) {
            let h = harness();
            let (id, _) = h.create(4, 0);
            let people: Vec<UserId> = (0..6).map(|_| UserId::new()).collect();

            let run = |steps: &[Step]| -> Vec<ServiceError> {
                steps
                    .iter()
                    .filter_map(|s| match *s {
                        Step::Rsvp(p, v) => h.ledger.rsvp(people[p], id, Amount::new(v)).err(),
                        Step::CheckIn(p) => h.ledger.check_in(people[p], id).err(),
                    })
                    .collect()
            };
            let mut failures = run(&before);
            h.clock.advance(Duration::minutes(90));
            failures.extend(run(&during));

            for err in &failures {
                prop_assert!(
                    matches!(
                        err,
                        ServiceError::Rejected(
                            LedgerError::AlreadyRsvpd
                                | LedgerError::EventIsFull
                                | LedgerError::EventHasNotStarted
                                | LedgerError::HasNotRsvpd
                                | LedgerError::AlreadyCheckedIn
                        )
                    ),
                    "unexpected failure: {:?}",
                    err
                );
            }

            let projection = custody();
            projection.rebuild_from_store(h.ledger.store()).unwrap();

            let snapshot = h.ledger.event(id).unwrap();
            prop_assert!(snapshot.details.current_participants <= snapshot.details.max_participants);
            prop_assert_eq!(projection.held_in_custody(id), snapshot.held_in_custody);
            prop_assert_eq!(
                h.funds.total_paid().saturating_add(snapshot.held_in_custody),
                projection.list(id).iter().fold(Amount::ZERO, |acc, e| acc.saturating_add(e.amount))
            );
        }
    }
}
