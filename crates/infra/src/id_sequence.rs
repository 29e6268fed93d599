//! Event id allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use rollcall_core::EventId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("event id sequence exhausted")]
pub struct SequenceExhausted;

/// Source of fresh event ids.
///
/// Ids are handed out once each, in increasing order. Callers allocate only
/// after a creation request has been validated.
pub trait IdSequence: Send + Sync {
    fn next_id(&self) -> Result<EventId, SequenceExhausted>;

    /// The id the next call to `next_id` would return.
    fn peek(&self) -> Option<EventId>;
}

/// Process-wide counter with an atomic increment, starting at 1.
#[derive(Debug)]
pub struct AtomicIdSequence {
    next: AtomicU64,
}

impl AtomicIdSequence {
    pub fn new() -> Self {
        Self::starting_at(EventId::FIRST)
    }

    /// Resume after ids that were already issued (e.g. after a replay).
    pub fn starting_at(first: EventId) -> Self {
        Self {
            next: AtomicU64::new(first.get()),
        }
    }
}

impl Default for AtomicIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSequence for AtomicIdSequence {
    fn next_id(&self) -> Result<EventId, SequenceExhausted> {
        // u64::MAX is never issued; it marks exhaustion.
        let issued = self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map_err(|_| SequenceExhausted)?;
        EventId::new(issued).ok_or(SequenceExhausted)
    }

    fn peek(&self) -> Option<EventId> {
        let next = self.next.load(Ordering::SeqCst);
        if next == u64::MAX {
            return None;
        }
        EventId::new(next)
    }
}
