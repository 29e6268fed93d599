use chrono::{DateTime, Utc};

/// An observable fact emitted by a committed operation.
///
/// Notifications are immutable, versioned, and append-only.
pub trait Notification: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable type identifier (e.g. "ledger.event.created").
    fn notification_type(&self) -> &'static str;

    /// Schema version for this notification type.
    fn version(&self) -> u32;

    /// When the operation happened, as supplied by the caller's clock.
    fn occurred_at(&self) -> DateTime<Utc>;
}
