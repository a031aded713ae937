//! Candidate pool management.
//!
//! # Responsibilities
//! - Hold the ordered set of candidate endpoints, at most one per uri
//! - Write every mutation through to the connection store before applying it
//! - Track per-endpoint liveness (memory only)

use std::sync::Arc;

use crate::endpoint::descriptor::{EndpointDescriptor, Liveness};
use crate::orchestrator::types::{ConnectionError, ConnectionResult};
use crate::store::ConnectionStore;

/// In-memory mirror of the persisted candidate list.
pub struct CandidatePool {
    endpoints: Vec<EndpointDescriptor>,
    store: Arc<dyn ConnectionStore>,
}

impl CandidatePool {
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self {
            endpoints: Vec::new(),
            store,
        }
    }

    /// Add a new candidate. Fails if the uri is already present.
    pub fn add(&mut self, endpoint: EndpointDescriptor) -> ConnectionResult<()> {
        if self.contains(&endpoint.uri) {
            return Err(ConnectionError::DuplicateEndpoint(endpoint.uri));
        }
        self.store.save(&endpoint)?;
        self.endpoints.push(endpoint);
        Ok(())
    }

    /// Add a candidate unless its uri is already present.
    ///
    /// Returns true if the candidate was added.
    pub fn add_if_absent(&mut self, endpoint: EndpointDescriptor) -> ConnectionResult<bool> {
        if self.contains(&endpoint.uri) {
            return Ok(false);
        }
        self.add(endpoint)?;
        Ok(true)
    }

    /// Insert or replace by uri, keeping the existing position on replace.
    pub fn upsert(&mut self, endpoint: EndpointDescriptor) -> ConnectionResult<()> {
        self.store.save(&endpoint)?;
        match self.position(&endpoint.uri) {
            Some(idx) => self.endpoints[idx] = endpoint,
            None => self.endpoints.push(endpoint),
        }
        Ok(())
    }

    /// Remove by uri. No-op if absent.
    pub fn remove(&mut self, uri: &str) -> ConnectionResult<Option<EndpointDescriptor>> {
        let Some(idx) = self.position(uri) else {
            return Ok(None);
        };
        self.store.delete(uri)?;
        Ok(Some(self.endpoints.remove(idx)))
    }

    /// Mirror an endpoint that was read from the store, without writing back.
    pub(crate) fn restore(&mut self, endpoint: EndpointDescriptor) -> bool {
        if self.contains(&endpoint.uri) {
            tracing::warn!(uri = %endpoint.uri, "Ignoring duplicate persisted connection");
            return false;
        }
        self.endpoints.push(endpoint);
        true
    }

    /// Drop the in-memory mirror. The store is left untouched.
    pub(crate) fn clear(&mut self) {
        self.endpoints.clear();
    }

    /// Record a probe outcome. Returns false if the uri is not in the pool.
    pub fn record_liveness(&mut self, uri: &str, liveness: Liveness) -> bool {
        match self.endpoints.iter_mut().find(|e| e.uri == uri) {
            Some(endpoint) => {
                endpoint.liveness = liveness;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, uri: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|e| e.uri == uri)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.position(uri).is_some()
    }

    /// Snapshot copy in pool order.
    pub fn list(&self) -> Vec<EndpointDescriptor> {
        self.endpoints.clone()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    fn position(&self, uri: &str) -> Option<usize> {
        self.endpoints.iter().position(|e| e.uri == uri)
    }
}

impl std::fmt::Debug for CandidatePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidatePool")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}
