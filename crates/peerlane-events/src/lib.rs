#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Shared transfer vocabularies and the lifecycle event bus.
//!
//! The bus assigns sequential identifiers to events and keeps a bounded replay
//! ring so late subscribers can catch up from a known id. It is built on
//! `tokio::broadcast`; publishing never blocks and works without a runtime, so
//! engine callbacks on arbitrary threads can publish directly.

pub mod error;
pub mod payloads;

pub use error::{EventBusError, EventBusResult};
pub use payloads::{
    DEFAULT_REPLAY_CAPACITY, DownloadState, Event, EventEnvelope, EventId, RemovalReason,
    UploadState,
};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    replay: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a bus with the provided replay capacity.
    ///
    /// A zero capacity is raised to one so the broadcast channel can be built.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish an event, returning its identifier. Delivery to zero
    /// subscribers is not an error here.
    pub fn publish(&self, event: Event) -> EventId {
        let (id, _) = self.record_and_send(event);
        id
    }

    /// Publish an event and report when no live subscriber received it.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::NoSubscribers`] when the broadcast channel has
    /// no receivers. The event is still kept for replay.
    pub fn publish_checked(&self, event: Event) -> EventBusResult<EventId> {
        let kind = event.kind();
        let (id, delivered) = self.record_and_send(event);
        if delivered {
            Ok(id)
        } else {
            Err(EventBusError::NoSubscribers { event_id: id, kind })
        }
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let receiver = self.sender.subscribe();
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            backlog.extend(self.lock_replay().iter().filter(|item| item.id > since).cloned());
        }
        let replayed_through = backlog.back().map(|item| item.id);
        EventStream {
            backlog,
            receiver,
            replayed_through,
        }
    }

    /// Returns the last assigned identifier, if any events have been published.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_replay().back().map(|event| event.id)
    }

    fn record_and_send(&self, event: Event) -> (EventId, bool) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut replay = self.lock_replay();
            if replay.len() == self.replay_capacity {
                let _ = replay.pop_front();
            }
            replay.push_back(envelope.clone());
        }

        let delivered = self.sender.send(envelope).is_ok();
        (id, delivered)
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.replay.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that yields events from the replay backlog first, then from
/// the live broadcast channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
    replayed_through: Option<EventId>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) if self.already_replayed(&event) => {}
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`Self::next`].
    pub fn try_next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.already_replayed(&event) => {}
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }

    fn already_replayed(&self, event: &EventEnvelope) -> bool {
        self.replayed_through.is_some_and(|through| event.id <= through)
    }
}
