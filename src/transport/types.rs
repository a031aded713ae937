//! Daemon RPC types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur talking to a daemon.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the timeout.
    #[error("request to {uri} timed out after {timeout_ms} ms")]
    Timeout { uri: String, timeout_ms: u64 },

    /// Connection or HTTP-level failure.
    #[error("HTTP error from {uri}: {message}")]
    Http { uri: String, message: String },

    /// The daemon answered with a JSON-RPC error.
    #[error("RPC error from {uri}: {message}")]
    Rpc { uri: String, message: String },

    /// The response could not be decoded.
    #[error("invalid response from {uri}: {message}")]
    Decode { uri: String, message: String },

    /// The HTTP client could not be built.
    #[error("transport setup failed: {0}")]
    Setup(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Daemon status as reported by one `get_info` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonInfo {
    pub height: u64,
    /// Network height the daemon is catching up to; 0 when fully synced.
    pub target_height: u64,
    pub busy_syncing: bool,
    /// Local height excluding blocks served by a bootstrap daemon.
    pub height_without_bootstrap: Option<u64>,
}

/// One peer connection of the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub address: String,
    pub online: bool,
}
