//! `EventLedger`: the service facade over the ledger domain.
//!
//! Each operation runs under its event's lock:
//!
//! ```text
//! read clock → commit (load, decide, append) → pay out → publish
//! ```
//!
//! The store is the source of truth. A payout that fails after its
//! settlement committed is reported as `ServiceError::Transfer` and logged
//! for reconciliation; a failed publication is only logged, since
//! subscribers rebuild from the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use rollcall_core::{Amount, Clock, EventId, UserId};
use rollcall_events::{Envelope, NotificationBus, Subscription};
use rollcall_ledger::{
    AGGREGATE_TYPE, CheckIn, CreateEvent, EventDraft, EventMetadata, EventRecord, EventSnapshot,
    LedgerCommand, LedgerError, LedgerNotification, Rsvp, WithdrawProceeds,
};

use crate::command_dispatcher::{CommandDispatcher, Committed, DispatchError};
use crate::config::LedgerConfig;
use crate::funds::{FundsTransfer, TransferError};
use crate::id_sequence::{AtomicIdSequence, IdSequence};
use crate::locks::EventLocks;
use crate::notification_store::NotificationStore;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Rejected(#[from] LedgerError),

    #[error("infrastructure failure: {0}")]
    Infrastructure(String),

    #[error("event id sequence exhausted")]
    IdSequenceExhausted,

    /// The settlement committed but its payout did not go through.
    #[error("payout of {amount} to {recipient} for event {event_id} failed: {source}")]
    Transfer {
        event_id: EventId,
        recipient: UserId,
        amount: Amount,
        #[source]
        source: TransferError,
    },
}

impl ServiceError {
    /// The domain rejection, if this is one.
    pub fn rejection(&self) -> Option<&LedgerError> {
        match self {
            ServiceError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

pub struct EventLedger<S, B, F, C> {
    dispatcher: CommandDispatcher<S, B>,
    funds: F,
    clock: C,
    ids: Arc<dyn IdSequence>,
    locks: EventLocks,
    config: LedgerConfig,
}

impl<S, B, F, C> EventLedger<S, B, F, C>
where
    S: NotificationStore,
    B: NotificationBus<Envelope<JsonValue>>,
    F: FundsTransfer,
    C: Clock,
{
    pub fn new(store: S, bus: B, funds: F, clock: C, config: LedgerConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            funds,
            clock,
            ids: Arc::new(AtomicIdSequence::new()),
            locks: EventLocks::new(),
            config,
        }
    }

    /// Replace the id sequence (e.g. to resume after existing events).
    pub fn with_id_sequence(mut self, ids: Arc<dyn IdSequence>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.dispatcher.store()
    }

    pub fn subscribe(&self) -> Subscription<Envelope<JsonValue>> {
        self.dispatcher.bus().subscribe()
    }

    /// The id the next successful `create_event` will return.
    pub fn next_event_id(&self) -> Option<EventId> {
        self.ids.peek()
    }

    /// Register a new event organised by `caller`.
    ///
    /// The draft is validated before an id is allocated, so a rejected
    /// draft leaves the sequence untouched.
    pub fn create_event(&self, caller: UserId, draft: EventDraft) -> Result<EventId, ServiceError> {
        let now = self.clock.now();
        if let Err(e) = draft.validate(now) {
            debug!(organizer = %caller, error = %e, "create_event rejected");
            return Err(e.into());
        }

        let event_id = self
            .ids
            .next_id()
            .map_err(|_| ServiceError::IdSequenceExhausted)?;

        let command = LedgerCommand::CreateEvent(CreateEvent {
            event_id,
            organizer: caller,
            draft,
            occurred_at: now,
        });
        self.run("create_event", event_id, |_| command)?;

        info!(event_id = %event_id, organizer = %caller, "event created");
        Ok(event_id)
    }

    /// `(name, organizer)` of an existing event.
    pub fn event_metadata(&self, event_id: EventId) -> Result<EventMetadata, ServiceError> {
        Ok(self.load(event_id)?.metadata()?)
    }

    pub fn event(&self, event_id: EventId) -> Result<EventSnapshot, ServiceError> {
        Ok(self.load(event_id)?.snapshot()?)
    }

    /// Reserve a place, taking `value_sent` into custody.
    pub fn rsvp(&self, caller: UserId, event_id: EventId, value_sent: Amount) -> Result<(), ServiceError> {
        self.run("rsvp", event_id, |now| {
            LedgerCommand::Rsvp(Rsvp {
                event_id,
                participant: caller,
                value_sent,
                occurred_at: now,
            })
        })?;

        info!(event_id = %event_id, participant = %caller, amount = %value_sent, "rsvp recorded");
        Ok(())
    }

    /// Check in during the event window; returns the released stake.
    pub fn check_in(&self, caller: UserId, event_id: EventId) -> Result<Amount, ServiceError> {
        let committed = self.run("check_in", event_id, |now| {
            LedgerCommand::CheckIn(CheckIn {
                event_id,
                participant: caller,
                occurred_at: now,
            })
        })?;

        let released = committed
            .notifications
            .iter()
            .find_map(|n| match n {
                LedgerNotification::ParticipantCheckedIn(c) => Some(c.released),
                _ => None,
            })
            .unwrap_or(Amount::ZERO);

        info!(event_id = %event_id, participant = %caller, amount = %released, "participant checked in");
        Ok(released)
    }

    /// Collect the stakes of no-shows after the event ended (organizer only, once).
    pub fn withdraw_proceeds(&self, caller: UserId, event_id: EventId) -> Result<Amount, ServiceError> {
        let policy = self.config.withdrawal_policy;
        let committed = self.run("withdraw_proceeds", event_id, |now| {
            LedgerCommand::WithdrawProceeds(WithdrawProceeds {
                event_id,
                caller,
                policy,
                occurred_at: now,
            })
        })?;

        let amount = committed
            .notifications
            .iter()
            .find_map(|n| match n {
                LedgerNotification::ProceedsWithdrawn(w) => Some(w.amount),
                _ => None,
            })
            .unwrap_or(Amount::ZERO);

        info!(event_id = %event_id, organizer = %caller, amount = %amount, "proceeds withdrawn");
        Ok(amount)
    }

    fn load(&self, event_id: EventId) -> Result<EventRecord, ServiceError> {
        self.dispatcher
            .load(event_id, EventRecord::empty)
            .map_err(|e| dispatch_failure("load", event_id, e))
    }

    fn run(
        &self,
        op: &'static str,
        event_id: EventId,
        command: impl FnOnce(DateTime<Utc>) -> LedgerCommand,
    ) -> Result<Committed<LedgerNotification>, ServiceError> {
        self.locks.with(event_id, || {
            let now = self.clock.now();
            let committed = self
                .dispatcher
                .commit(AGGREGATE_TYPE, command(now), EventRecord::empty)
                .map_err(|e| dispatch_failure(op, event_id, e))?;

            let paid = self.pay_out(&committed.notifications);

            if let Err(e) = self.dispatcher.publish(&committed.stored) {
                warn!(op, event_id = %event_id, error = %e, "committed notifications not published");
            }

            paid.map(|_| committed)
        })
    }

    fn pay_out(&self, notifications: &[LedgerNotification]) -> Result<(), ServiceError> {
        for n in notifications {
            let Some((recipient, amount)) = n.payout() else {
                continue;
            };
            let event_id = n.event_id();

            if let Err(source) = self.funds.release(event_id, recipient, amount) {
                error!(
                    event_id = %event_id,
                    recipient = %recipient,
                    amount = %amount,
                    error = %source,
                    "payout failed after settlement committed"
                );
                return Err(ServiceError::Transfer {
                    event_id,
                    recipient,
                    amount,
                    source,
                });
            }
        }
        Ok(())
    }
}

fn dispatch_failure(op: &'static str, event_id: EventId, err: DispatchError<LedgerError>) -> ServiceError {
    match err {
        DispatchError::Rejected(e) => {
            debug!(op, event_id = %event_id, error = %e, "command rejected");
            ServiceError::Rejected(e)
        }
        other => {
            error!(op, event_id = %event_id, error = %other, "ledger infrastructure failure");
            ServiceError::Infrastructure(other.to_string())
        }
    }
}
