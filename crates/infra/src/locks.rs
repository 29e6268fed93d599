//! Per-event serialisation.
//!
//! Every mutating operation on an event runs while holding that event's lock,
//! so capacity and single-RSVP checks cannot interleave. Operations on
//! different events proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rollcall_core::EventId;

#[derive(Debug, Default)]
pub struct EventLocks {
    locks: Mutex<HashMap<EventId, Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    lock: Arc<Mutex<()>>,
    /// Callers holding or waiting for `lock`.
    users: usize,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<EventId, Slot>> {
        // The map and the per-event mutexes guard no data, so a poisoned
        // lock is still usable.
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` while holding the lock of `event_id`.
    pub fn with<T>(&self, event_id: EventId, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut map = self.registry();
            let slot = map.entry(event_id).or_default();
            slot.users += 1;
            slot.lock.clone()
        };
        let _release = Release {
            locks: self,
            event_id,
        };
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of events with an operation in flight.
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes the slot of an event when its last caller leaves, so ids that
/// were never issued leave nothing behind. Runs on unwind too.
struct Release<'a> {
    locks: &'a EventLocks,
    event_id: EventId,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.registry();
        let Some(slot) = map.get_mut(&self.event_id) else {
            return;
        };
        slot.users = slot.users.saturating_sub(1);
        if slot.users == 0 {
            map.remove(&self.event_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn same_event_runs_one_at_a_time() {
        let locks = Arc::new(EventLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (locks, inside, max_seen) = (locks.clone(), inside.clone(), max_seen.clone());
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        locks.with(EventId::FIRST, || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            std::thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panics_do_not_wedge_the_event() {
        let locks = Arc::new(EventLocks::new());
        let l = locks.clone();
        let _ = std::thread::spawn(move || l.with(EventId::FIRST, || panic!("boom"))).join();

        assert_eq!(locks.with(EventId::FIRST, || 7), 7);
        assert!(locks.is_empty());
    }

    #[test]
    fn entries_are_released_after_use() {
        let locks = EventLocks::new();
        for i in 1..=1000 {
            let id = EventId::new(i).unwrap();
            locks.with(id, || assert_eq!(locks.len(), 1));
        }
        assert!(locks.is_empty());
    }

    #[test]
    fn waiters_keep_the_entry_alive() {
        let locks = Arc::new(EventLocks::new());
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (go_tx, go_rx) = std::sync::mpsc::channel::<()>();

        let holder = {
            let locks = locks.clone();
            std::thread::spawn(move || {
                locks.with(EventId::FIRST, || {
                    entered_tx.send(()).unwrap();
                    go_rx.recv().unwrap();
                })
            })
        };
        entered_rx.recv().unwrap();

        let waiter = {
            let locks = locks.clone();
            std::thread::spawn(move || locks.with(EventId::FIRST, || 1))
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        go_tx.send(()).unwrap();

        holder.join().unwrap();
        assert_eq!(waiter.join().unwrap(), 1);
        assert!(locks.is_empty());
    }
}
