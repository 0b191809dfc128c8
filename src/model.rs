//! Data model for the hosted roster document.
//!
//! The remote host stores the roster as a single JSON file whose top-level
//! value is a bare array of entries. There is no envelope and no schema
//! version field; the revision token lives in the host's metadata, never in
//! the document itself.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Blocked,
}

/// One record in the managed list.
///
/// The identifier is the natural key, but uniqueness is not enforced:
/// duplicates are legal and every transform treats them independently by
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub identifier: String,
    pub status: Status,
}

impl Entry {
    /// New entry in the `active` state, the state every addition starts in.
    pub fn active(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            status: Status::Active,
        }
    }
}

/// The full ordered list of entries as hosted remotely.
///
/// A document is a value, not a place: transforms always build a new
/// `Document` and the old one stays untouched until it is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Vec<Entry>);

impl Document {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
