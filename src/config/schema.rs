//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::endpoint::{EndpointDescriptor, Network};
use crate::orchestrator::ClientMode;

/// Root configuration for the connection service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DaemonConfig {
    /// Network whose built-in endpoints seed the candidate pool.
    pub network: Network,

    /// `desktop` enables auto-switch at startup when no node is configured.
    pub mode: ClientMode,

    /// Explicitly configured daemon.
    pub node: NodeConfig,

    pub polling: PollingConfig,

    pub peers: PeersConfig,

    pub storage: StorageConfig,

    pub observability: ObservabilityConfig,
}

/// Daemon supplied by the operator. Empty uri means none.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    pub uri: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl NodeConfig {
    /// The configured endpoint at priority 1, if a uri is set.
    pub fn endpoint(&self) -> Option<EndpointDescriptor> {
        let uri = self.uri.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        Some(
            EndpointDescriptor::new(uri)
                .with_priority(1)
                .with_credentials(self.username.clone(), self.password.clone()),
        )
    }
}

/// Health polling and failover tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Adaptive period for an idle local daemon (ms).
    pub local_refresh_ms: u64,

    /// Adaptive period for remote or syncing daemons (ms).
    pub remote_refresh_ms: u64,

    /// Liveness probe timeout (ms).
    pub probe_timeout_ms: u64,

    /// At most one poll-failure warning per window (seconds).
    pub error_log_window_secs: u64,

    /// Consecutive failed ticks before an automatic switch.
    pub failures_before_switch: u32,

    /// Blocks the daemon may trail its target height and still count as synced.
    pub sync_tolerance_blocks: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            local_refresh_ms: 5_000,
            remote_refresh_ms: 20_000,
            probe_timeout_ms: 10_000,
            error_log_window_secs: 300,
            failures_before_switch: 1,
            sync_tolerance_blocks: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PeersConfig {
    /// Online peers required before broadcasting.
    pub min_broadcast_connections: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding persisted connections. In-memory when unset.
    pub path: Option<PathBuf>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
