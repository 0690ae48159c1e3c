//! Delivery failures reported by [`crate::EventBus::publish_checked`].

use thiserror::Error;

use crate::payloads::EventId;

/// Reason a published event reached no live subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EventBusError {
    /// The broadcast channel had no receivers. The envelope is still in the
    /// replay ring and reaches subscribers that resume from an earlier id.
    #[error("event had no live subscribers")]
    NoSubscribers {
        /// Identifier the bus assigned to the event.
        event_id: EventId,
        /// [`crate::Event::kind`] of the undelivered event.
        kind: &'static str,
    },
}

impl EventBusError {
    /// Identifier of the undelivered event.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        let Self::NoSubscribers { event_id, .. } = self;
        *event_id
    }

    /// Kind of the undelivered event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        let Self::NoSubscribers { kind, .. } = self;
        kind
    }
}

/// Result of a checked publish.
pub type EventBusResult<T> = Result<T, EventBusError>;
