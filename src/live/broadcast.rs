//! Snapshot fan-out to registered subscribers.

use std::sync::Arc;

use crate::store::GithubStore;

use super::SubscriberRegistry;

/// Pushes the hosted document to every registered subscriber after a
/// successful mutation.
pub struct Broadcaster {
    store: Arc<GithubStore>,
    registry: Arc<SubscriberRegistry>,
}

impl Broadcaster {
    pub fn new(store: Arc<GithubStore>, registry: Arc<SubscriberRegistry>) -> Self {
        Self { store, registry }
    }

    /// Re-read the document and deliver it to every current subscriber.
    ///
    /// The read is fresh rather than reusing the value the mutation engine
    /// just wrote: subscribers must see exactly what the host holds now,
    /// even if another writer landed in between. Never fails: a failed read
    /// means this update is skipped and subscribers catch up on the next
    /// one, and a dead transport is pruned without touching the other
    /// deliveries.
    pub async fn notify_all(&self) {
        let document = match self.store.read().await {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(error = %err, "broadcast read failed, skipping update");
                return;
            }
        };

        let payload = match serde_json::to_string(&document) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "snapshot serialization failed, skipping update");
                return;
            }
        };

        for subscriber in self.registry.snapshot() {
            if !subscriber.deliver(payload.clone()) {
                tracing::debug!(subscriber = %subscriber.id(), "transport closed, pruning subscriber");
                self.registry.remove(subscriber.id());
            }
        }

        tracing::debug!(
            subscribers = self.registry.len(),
            entries = document.len(),
            "snapshot broadcast"
        );
    }
}
