//! Daemon JSON-RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Probe an endpoint for reachability and measure round-trip time
//! - Fetch daemon status (`get_info`) and peer connections (`get_connections`)
//! - Map network, HTTP and RPC failures onto `TransportError`

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::endpoint::EndpointDescriptor;
use crate::transport::types::{DaemonInfo, PeerInfo, TransportError, TransportResult};

/// Transport collaborator used by the orchestrator, selector and poller.
#[async_trait]
pub trait DaemonTransport: Send + Sync {
    /// Check reachability within `timeout`. Returns the round-trip time.
    async fn probe(&self, endpoint: &EndpointDescriptor, timeout: Duration) -> TransportResult<Duration>;

    async fn fetch_daemon_info(&self, endpoint: &EndpointDescriptor) -> TransportResult<DaemonInfo>;

    async fn fetch_peers(&self, endpoint: &EndpointDescriptor) -> TransportResult<Vec<PeerInfo>>;
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct GetInfoResult {
    #[serde(default)]
    height: u64,
    #[serde(default)]
    target_height: u64,
    #[serde(default)]
    busy_syncing: bool,
    #[serde(default)]
    height_without_bootstrap: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GetConnectionsResult {
    #[serde(default)]
    connections: Vec<ConnectionEntry>,
}

#[derive(Debug, Deserialize)]
struct ConnectionEntry {
    address: String,
    #[serde(default)]
    state: String,
}

/// JSON-RPC transport over HTTP.
#[derive(Clone)]
pub struct JsonRpcTransport {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl JsonRpcTransport {
    /// Create a transport whose non-probe requests time out after `request_timeout`.
    pub fn new(request_timeout: Duration) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &EndpointDescriptor,
        method: &str,
        timeout: Duration,
    ) -> TransportResult<T> {
        let url = format!("{}/json_rpc", endpoint.uri.trim_end_matches('/'));
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": "0",
            "method": method,
        });

        let mut request = self.client.post(&url).json(&body).timeout(timeout);
        if let Some(username) = &endpoint.username {
            request = request.basic_auth(username, endpoint.password.as_ref());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    uri: endpoint.uri.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                }
            } else {
                TransportError::Http {
                    uri: endpoint.uri.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Http {
                uri: endpoint.uri.clone(),
                message: format!("{} returned status {}", method, status),
            });
        }

        let envelope: RpcEnvelope<T> = response.json().await.map_err(|e| TransportError::Decode {
            uri: endpoint.uri.clone(),
            message: e.to_string(),
        })?;

        if let Some(error) = envelope.error {
            return Err(TransportError::Rpc {
                uri: endpoint.uri.clone(),
                message: format!("{} (code {})", error.message, error.code),
            });
        }

        envelope.result.ok_or_else(|| TransportError::Decode {
            uri: endpoint.uri.clone(),
            message: format!("{} response has no result", method),
        })
    }
}

#[async_trait]
impl DaemonTransport for JsonRpcTransport {
    async fn probe(&self, endpoint: &EndpointDescriptor, timeout: Duration) -> TransportResult<Duration> {
        let started = Instant::now();
        self.call::<serde_json::Value>(endpoint, "get_version", timeout).await?;
        Ok(started.elapsed())
    }

    async fn fetch_daemon_info(&self, endpoint: &EndpointDescriptor) -> TransportResult<DaemonInfo> {
        let info: GetInfoResult = self.call(endpoint, "get_info", self.request_timeout).await?;
        Ok(DaemonInfo {
            height: info.height,
            target_height: info.target_height,
            busy_syncing: info.busy_syncing,
            height_without_bootstrap: info.height_without_bootstrap,
        })
    }

    async fn fetch_peers(&self, endpoint: &EndpointDescriptor) -> TransportResult<Vec<PeerInfo>> {
        let result: GetConnectionsResult = self
            .call(endpoint, "get_connections", self.request_timeout)
            .await?;
        Ok(result
            .connections
            .into_iter()
            .map(|c| PeerInfo {
                online: c.state != "before_handshake",
                address: c.address,
            })
            .collect())
    }
}

impl std::fmt::Debug for JsonRpcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcTransport")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
