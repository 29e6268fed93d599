use rollcall_core::EventId;

/// A command targets exactly one event stream.
///
/// Commands express intent and are never persisted; the notifications they
/// produce are. Each command operates on one stream, which is the unit of
/// serialisation and of optimistic concurrency.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target(&self) -> EventId;
}
