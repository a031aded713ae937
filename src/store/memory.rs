//! In-memory connection store.

use std::sync::{Mutex, MutexGuard};

use crate::endpoint::EndpointDescriptor;
use crate::store::{ConnectionStore, PersistedConnections, StoreError, StoreResult};

/// A store that keeps everything in process memory.
///
/// Used when no storage path is configured, and by tests to inspect what the
/// orchestrator persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<PersistedConnections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously persisted state.
    pub fn with_state(state: PersistedConnections) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Copy of the current persisted state.
    pub fn snapshot(&self) -> StoreResult<PersistedConnections> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, PersistedConnections>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ConnectionStore for MemoryStore {
    fn load(&self) -> StoreResult<PersistedConnections> {
        self.snapshot()
    }

    fn save(&self, endpoint: &EndpointDescriptor) -> StoreResult<()> {
        self.lock()?.upsert(endpoint);
        Ok(())
    }

    fn delete(&self, uri: &str) -> StoreResult<()> {
        self.lock()?.remove(uri);
        Ok(())
    }

    fn set_current_uri(&self, uri: Option<&str>) -> StoreResult<()> {
        self.lock()?.current_uri = uri.map(str::to_string);
        Ok(())
    }

    fn set_auto_switch(&self, auto_switch: bool) -> StoreResult<()> {
        self.lock()?.auto_switch = auto_switch;
        Ok(())
    }

    fn set_refresh_period(&self, refresh_period_ms: i64) -> StoreResult<()> {
        self.lock()?.refresh_period_ms = refresh_period_ms;
        Ok(())
    }
}
