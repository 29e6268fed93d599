//! Append-only notification store.
//!
//! One stream per event id. The store is the source of truth: aggregates are
//! rehydrated from it and the bus only distributes what it committed.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryNotificationStore;
pub use r#trait::{NotificationStore, StoreError, StoredNotification, UncommittedNotification};
