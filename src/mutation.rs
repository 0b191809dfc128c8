//! Named transforms over the roster and the read-modify-write engine that
//! commits them.

use std::sync::Arc;

use crate::live::Broadcaster;
use crate::model::{Document, Entry, Status};
use crate::store::{GithubStore, RevisionToken, StoreError};

/// A named transform over the hosted document.
///
/// Every transform is pure: it consumes the current document by reference
/// and produces a new one. Matching is by identifier equality, and because
/// duplicates are legal, delete/block/rename touch every matching entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Append a new active entry.
    Add { identifier: String },
    /// Remove every entry with this identifier.
    Delete { identifier: String },
    /// Mark every entry with this identifier as blocked.
    Block { identifier: String },
    /// Give every entry matching the old identifier a new one. No
    /// uniqueness check; collisions with existing identifiers are permitted.
    Rename {
        old_identifier: String,
        new_identifier: String,
    },
}

impl Mutation {
    /// Produce the transformed document. The input is never edited in place.
    pub fn apply(&self, document: &Document) -> Document {
        match self {
            Mutation::Add { identifier } => {
                let mut entries = document.entries().to_vec();
                // An empty identifier falls through to an unchanged write.
                if !identifier.is_empty() {
                    entries.push(Entry::active(identifier.clone()));
                }
                Document::new(entries)
            }
            Mutation::Delete { identifier } => Document::new(
                document
                    .entries()
                    .iter()
                    .filter(|entry| entry.identifier != *identifier)
                    .cloned()
                    .collect(),
            ),
            Mutation::Block { identifier } => Document::new(
                document
                    .entries()
                    .iter()
                    .cloned()
                    .map(|mut entry| {
                        if entry.identifier == *identifier {
                            entry.status = Status::Blocked;
                        }
                        entry
                    })
                    .collect(),
            ),
            Mutation::Rename {
                old_identifier,
                new_identifier,
            } => Document::new(
                document
                    .entries()
                    .iter()
                    .cloned()
                    .map(|mut entry| {
                        if entry.identifier == *old_identifier {
                            entry.identifier = new_identifier.clone();
                        }
                        entry
                    })
                    .collect(),
            ),
        }
    }

    /// Human-readable change message recorded at the store.
    pub fn commit_message(&self) -> String {
        match self {
            Mutation::Add { identifier } => format!("Add entry {identifier}"),
            Mutation::Delete { identifier } => format!("Delete entry {identifier}"),
            Mutation::Block { identifier } => format!("Block entry {identifier}"),
            Mutation::Rename {
                old_identifier,
                new_identifier,
            } => format!("Rename entry {old_identifier} to {new_identifier}"),
        }
    }
}

/// Applies transforms through the store and kicks off the push fan-out.
pub struct MutationEngine {
    store: Arc<GithubStore>,
    broadcaster: Arc<Broadcaster>,
}

impl MutationEngine {
    pub fn new(store: Arc<GithubStore>, broadcaster: Arc<Broadcaster>) -> Self {
        Self { store, broadcaster }
    }

    /// Read the current document, apply the transform, and submit the
    /// result guarded by a freshly-fetched revision token.
    ///
    /// Store errors propagate unchanged. The mutation is complete once the
    /// write lands: the fan-out runs detached and its failures stay inside
    /// the broadcaster, so a subscriber can never fail a mutation.
    pub async fn apply(&self, mutation: Mutation) -> Result<RevisionToken, StoreError> {
        let current = self.store.read().await?;
        let next = mutation.apply(&current);
        let revision = self.store.write(&next, &mutation.commit_message()).await?;

        tracing::info!(
            change = %mutation.commit_message(),
            revision = %revision,
            entries = next.len(),
            "mutation committed"
        );

        let broadcaster = self.broadcaster.clone();
        tokio::spawn(async move { broadcaster.notify_all().await });

        Ok(revision)
    }
}
