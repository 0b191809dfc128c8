//! # Roster - Live-Synchronized List Administration
//!
//! Maintains a small list of entries as a single JSON document hosted in a
//! GitHub repository, and serves an admin surface that keeps every connected
//! viewer synchronized through server-sent events.
//!
//! ## How it stays consistent
//!
//! - **Optimistic writes**: every mutation re-fetches the file's revision
//!   token immediately before submitting, and the host rejects stale tokens,
//!   so concurrent writers fail loudly instead of silently clobbering each
//!   other.
//! - **Push fan-out**: after each successful write the broadcaster re-reads
//!   the hosted document and pushes the fresh snapshot to every open stream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roster::store::{GithubConfig, GithubStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(GithubStore::new(GithubConfig::from_env()?)?);
//!     roster::server::start(([0, 0, 0, 0], 3000).into(), store).await
//! }
//! ```

pub mod live;
pub mod model;
pub mod mutation;
pub mod server;
pub mod store;

// Re-export main types for library consumers
pub use live::{Broadcaster, Subscriber, SubscriberRegistry};
pub use model::{Document, Entry, Status};
pub use mutation::{Mutation, MutationEngine};
pub use store::{GithubConfig, GithubStore, RevisionToken, StoreError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
