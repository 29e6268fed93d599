//! Strongly-typed identifiers used across the domain.

use core::num::NonZeroU64;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a registered event.
///
/// Ids are dense and sequential starting at 1. Zero is unrepresentable, so an
/// absent record can never be confused with a real one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(NonZeroU64);

impl EventId {
    /// The first id ever issued.
    pub const FIRST: EventId = EventId(NonZeroU64::MIN);

    /// Returns `None` for the reserved value 0.
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// The id following this one, or `None` when the sequence is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u64> for EventId {
    type Error = DomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| DomainError::invalid_id("EventId: 0 is reserved"))
    }
}

impl From<EventId> for u64 {
    fn from(value: EventId) -> Self {
        value.get()
    }
}

impl FromStr for EventId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .parse::<u64>()
            .map_err(|e| DomainError::invalid_id(format!("EventId: {e}")))?;
        Self::try_from(raw)
    }
}

/// Identity of a caller (organizer or participant).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new identity.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing ids explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("UserId: {e}")))?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_event_id() {
        assert_eq!(EventId::new(0), None);
        assert!("0".parse::<EventId>().is_err());
        assert!(EventId::try_from(0).is_err());
    }

    #[test]
    fn event_ids_count_up_from_one() {
        assert_eq!(EventId::FIRST.get(), 1);
        assert_eq!(EventId::FIRST.next().map(EventId::get), Some(2));
        assert_eq!(EventId::new(u64::MAX).and_then(EventId::next), None);
    }

    #[test]
    fn event_id_serializes_as_plain_number() {
        let id = EventId::new(7).unwrap();
        assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!(7));
        let back: EventId = serde_json::from_value(serde_json::json!(7)).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_value::<EventId>(serde_json::json!(0)).is_err());
    }

    #[test]
    fn user_id_round_trips_through_display() {
        let id = UserId::new();
        assert_eq!(id.to_string().parse::<UserId>().unwrap(), id);
    }
}
