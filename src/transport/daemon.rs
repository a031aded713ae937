//! Daemon handle bound to a single endpoint.

use std::sync::Arc;

use crate::endpoint::EndpointDescriptor;
use crate::transport::client::DaemonTransport;
use crate::transport::types::{DaemonInfo, PeerInfo, TransportResult};

/// A daemon RPC handle for the active connection.
///
/// Recreated every time the active connection changes; cheap to clone.
#[derive(Clone)]
pub struct DaemonHandle {
    endpoint: EndpointDescriptor,
    transport: Arc<dyn DaemonTransport>,
}

impl DaemonHandle {
    pub fn new(endpoint: EndpointDescriptor, transport: Arc<dyn DaemonTransport>) -> Self {
        Self { endpoint, transport }
    }

    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    pub fn uri(&self) -> &str {
        &self.endpoint.uri
    }

    pub async fn get_info(&self) -> TransportResult<DaemonInfo> {
        self.transport.fetch_daemon_info(&self.endpoint).await
    }

    pub async fn get_peers(&self) -> TransportResult<Vec<PeerInfo>> {
        self.transport.fetch_peers(&self.endpoint).await
    }

    /// Peers currently online.
    pub async fn get_online_peers(&self) -> TransportResult<Vec<PeerInfo>> {
        let peers = self.get_peers().await?;
        Ok(peers.into_iter().filter(|p| p.online).collect())
    }
}

impl std::fmt::Debug for DaemonHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonHandle")
            .field("uri", &self.endpoint.uri)
            .finish()
    }
}
