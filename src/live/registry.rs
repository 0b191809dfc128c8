//! Subscription registry for open push streams.

use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// One open push-stream connection.
///
/// A subscriber is nothing but an output handle: it accepts snapshot
/// payloads until its transport goes away. There is no reconnection state; a
/// client that reconnects becomes a brand-new subscriber.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: Uuid,
    tx: UnboundedSender<String>,
}

impl Subscriber {
    /// Create a subscriber handle together with the receiving half its
    /// transport drains.
    pub fn channel() -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Push one snapshot payload. Returns `false` once the transport is gone.
    pub fn deliver(&self, payload: String) -> bool {
        self.tx.send(payload).is_ok()
    }
}

/// Membership tracker whose contents are exactly the set of currently-open
/// push streams: add on connect, remove on disconnect, nothing in between.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    members: DashMap<Uuid, Subscriber>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Idempotent: adding the same handle twice keeps
    /// a single membership, so each broadcast delivers at most once to it.
    pub fn add(&self, subscriber: Subscriber) {
        self.members.insert(subscriber.id, subscriber);
    }

    /// Drop a subscriber. No-op if it is already gone.
    pub fn remove(&self, id: Uuid) {
        self.members.remove(&id);
    }

    /// Copied view of the current membership. Iterating the copy never
    /// observes adds or removes racing with the same broadcast.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.members.iter().map(|m| m.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
