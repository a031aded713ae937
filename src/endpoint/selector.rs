//! Best-available endpoint selection.
//!
//! Probes candidates concurrently and picks the reachable one with the lowest
//! priority number. Ties go to the earlier candidate in pool order.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::endpoint::descriptor::{EndpointDescriptor, Liveness};
use crate::transport::{DaemonTransport, TransportResult};

/// Selection policy over a candidate snapshot. Never mutates the pool.
#[derive(Clone)]
pub struct ConnectionSelector {
    transport: Arc<dyn DaemonTransport>,
    probe_timeout: Duration,
}

impl ConnectionSelector {
    pub fn new(transport: Arc<dyn DaemonTransport>, probe_timeout: Duration) -> Self {
        Self {
            transport,
            probe_timeout,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Probe one endpoint.
    pub async fn probe(&self, endpoint: &EndpointDescriptor) -> TransportResult<Duration> {
        let result = self.transport.probe(endpoint, self.probe_timeout).await;
        match &result {
            Ok(latency) => {
                tracing::debug!(uri = %endpoint.uri, latency_ms = latency.as_millis() as u64, "Probe succeeded")
            }
            Err(e) => tracing::debug!(uri = %endpoint.uri, error = %e, "Probe failed"),
        }
        result
    }

    /// Probe every candidate concurrently. Returns copies with liveness filled in,
    /// in the same order as `candidates`.
    pub async fn probe_all(&self, candidates: &[EndpointDescriptor]) -> Vec<EndpointDescriptor> {
        let probes = candidates.iter().map(|candidate| async move {
            let mut probed = candidate.clone();
            probed.liveness = match self.probe(candidate).await {
                Ok(latency) => Liveness::reachable(latency),
                Err(e) => Liveness::unreachable(e.to_string()),
            };
            probed
        });
        join_all(probes).await
    }

    /// Best reachable candidate, or `None` if nothing answers.
    pub async fn best_available(&self, candidates: &[EndpointDescriptor]) -> Option<EndpointDescriptor> {
        let probed = self.probe_all(candidates).await;
        pick_best(&probed).cloned()
    }
}

/// Lowest priority number among reachable candidates; first wins on ties.
pub fn pick_best(probed: &[EndpointDescriptor]) -> Option<&EndpointDescriptor> {
    probed
        .iter()
        .filter(|e| e.is_reachable())
        .min_by_key(|e| e.priority)
}

impl std::fmt::Debug for ConnectionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSelector")
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}
