//! Projections: read models built from committed notifications.
//!
//! Every projection is rebuildable from the notification store and
//! idempotent under at-least-once delivery.

pub mod custody;

pub use custody::{CustodyEntry, CustodyProjection, CustodyProjectionError, StakeStatus};
