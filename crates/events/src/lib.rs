//! `rollcall-events`: notification mechanics (no business rules).
//!
//! Aggregates emit notifications; infrastructure wraps them in envelopes,
//! stores them and fans them out over a bus.

pub mod bus;
pub mod command;
pub mod envelope;
pub mod handler;
pub mod in_memory_bus;
pub mod notification;

pub use bus::{NotificationBus, Subscription};
pub use command::Command;
pub use envelope::Envelope;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBus, InMemoryBusError};
pub use notification::Notification;
