//! Orchestrator error definitions and shared types.

use thiserror::Error;

use crate::endpoint::EndpointDescriptor;
use crate::store::StoreError;
use crate::transport::TransportError;

/// Notification sent to subscribers whenever the active connection is (re)applied.
pub type ConnectionChange = Option<EndpointDescriptor>;

/// Whether the process is driven by an interactive client or an API user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    /// Interactive client: with no configured endpoint, auto-switch to the best candidate.
    #[default]
    Desktop,
    /// Headless API user: connections are chosen explicitly.
    Api,
}

/// Errors surfaced by connection operations.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The account gate is closed; nothing was changed.
    #[error("account is not open")]
    AccountNotOpen,

    #[error("no connection to daemon")]
    NoConnection,

    #[error("daemon is not synced: height {height}, target height {target_height}")]
    NotSynced { height: u64, target_height: u64 },

    #[error("endpoint already exists: {0}")]
    DuplicateEndpoint(String),

    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("invalid endpoint uri '{uri}': {reason}")]
    InvalidEndpoint { uri: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;
