//! Funds-transfer collaborator.
//!
//! Payouts happen after the ledger has committed the settlement that owes
//! them. The ledger never moves value itself; it asks a `FundsTransfer`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use rollcall_core::{Amount, EventId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("transfer rejected: {0}")]
    Rejected(String),

    #[error("recipient balance would overflow")]
    Overflow,
}

/// Moves custody value to a recipient.
pub trait FundsTransfer: Send + Sync {
    fn release(&self, event_id: EventId, to: UserId, amount: Amount) -> Result<(), TransferError>;
}

impl<F> FundsTransfer for Arc<F>
where
    F: FundsTransfer + ?Sized,
{
    fn release(&self, event_id: EventId, to: UserId, amount: Amount) -> Result<(), TransferError> {
        (**self).release(event_id, to, amount)
    }
}

/// One executed payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub event_id: EventId,
    pub to: UserId,
    pub amount: Amount,
}

#[derive(Debug, Default)]
struct Ledger {
    payouts: Vec<Payout>,
    balances: HashMap<UserId, Amount>,
}

/// Records payouts in memory (tests, local runs).
#[derive(Debug, Default)]
pub struct InMemoryFunds {
    inner: Mutex<Ledger>,
    failing: AtomicBool,
}

impl InMemoryFunds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent transfers fail (simulates an unavailable payment rail).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn payouts(&self) -> Vec<Payout> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .payouts
            .clone()
    }

    pub fn balance(&self, user: &UserId) -> Amount {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .balances
            .get(user)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn total_paid(&self) -> Amount {
        self.payouts()
            .iter()
            .fold(Amount::ZERO, |acc, p| acc.saturating_add(p.amount))
    }
}

impl FundsTransfer for InMemoryFunds {
    fn release(&self, event_id: EventId, to: UserId, amount: Amount) -> Result<(), TransferError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransferError::Rejected("payment rail unavailable".to_string()));
        }

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let balance = inner.balances.entry(to).or_insert(Amount::ZERO);
        *balance = balance.checked_add(amount).ok_or(TransferError::Overflow)?;
        inner.payouts.push(Payout { event_id, to, amount });
        Ok(())
    }
}
