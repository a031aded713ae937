//! Persistence of the candidate list and connection preferences.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     ConnectionStore::load() → PersistedConnections
//!     → CandidatePool mirror + FailoverPolicy + last current uri
//!
//! Every mutation (add/remove/switch/policy change):
//!     orchestrator → store (synchronous, durable before returning)
//!     → in-memory state updated afterwards
//! ```
//!
//! # Design Decisions
//! - Calls are synchronous; stores are expected to be local and fast
//! - `save` is insert-or-replace keyed by uri
//! - Encryption at rest is a concern of the store implementation, not of callers

pub mod file;
pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::EndpointDescriptor;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Everything a store remembers across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedConnections {
    /// Candidate endpoints in insertion order.
    pub connections: Vec<EndpointDescriptor>,
    /// URI of the last active connection.
    pub current_uri: Option<String>,
    pub auto_switch: bool,
    /// `0` = adaptive, positive = fixed period in ms, negative = disabled.
    pub refresh_period_ms: i64,
}

impl PersistedConnections {
    pub(crate) fn upsert(&mut self, endpoint: &EndpointDescriptor) {
        match self.connections.iter_mut().find(|c| c.uri == endpoint.uri) {
            Some(existing) => *existing = endpoint.clone(),
            None => self.connections.push(endpoint.clone()),
        }
    }

    pub(crate) fn remove(&mut self, uri: &str) {
        self.connections.retain(|c| c.uri != uri);
    }
}

/// Errors raised by a connection store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage format error: {0}")]
    Format(#[from] serde_json::Error),

    /// A writer panicked while holding the store lock.
    #[error("connection store lock poisoned")]
    Poisoned,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence collaborator for candidates and connection preferences.
pub trait ConnectionStore: Send + Sync {
    fn load(&self) -> StoreResult<PersistedConnections>;

    /// Insert or replace the endpoint with the same uri.
    fn save(&self, endpoint: &EndpointDescriptor) -> StoreResult<()>;

    /// Remove the endpoint with this uri, if any.
    fn delete(&self, uri: &str) -> StoreResult<()>;

    fn set_current_uri(&self, uri: Option<&str>) -> StoreResult<()>;

    fn set_auto_switch(&self, auto_switch: bool) -> StoreResult<()>;

    fn set_refresh_period(&self, refresh_period_ms: i64) -> StoreResult<()>;
}
