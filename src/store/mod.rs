pub mod github;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use github::{GithubConfig, GithubStore};

/// Opaque version marker the host assigns to the current document.
///
/// Presented back on every write so the host can reject writers that raced
/// against a newer revision. The value itself is never inspected, only
/// compared by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionToken(String);

impl RevisionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failures surfaced by the remote document store.
///
/// These propagate unchanged through the mutation engine to the request
/// surface; the core never retries on its own.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Read path unreachable or answered with a non-success status.
    #[error("document fetch failed: {0}")]
    Fetch(String),

    /// The fetched body is not a valid roster document.
    #[error("malformed document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The current revision token could not be obtained before a write.
    #[error("cannot resolve current revision: {0}")]
    Metadata(String),

    /// The host rejected the presented revision token; a concurrent writer
    /// won the race. Retrying is the caller's decision.
    #[error("write conflict on revision {revision}: {detail}")]
    Conflict {
        revision: RevisionToken,
        detail: String,
    },

    /// Any other write failure, carrying the host's raw response text.
    #[error("write rejected by store: {0}")]
    Write(String),
}

impl StoreError {
    /// True when the failure means another writer committed first.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
