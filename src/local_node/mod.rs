//! Local daemon integration.
//!
//! # Data Flow
//! ```text
//! LocalNode (process manager for a co-located daemon)
//!     → LocalNodeEvent::{Started, Stopped} on a broadcast channel
//!     → bridge.rs
//!         Started: probe the local endpoint → set_connection
//!         Stopped: check_connection → failover when the check fails
//! ```
//!
//! # Design Decisions
//! - The bridge holds a weak orchestrator handle and exits once it is gone
//! - All switching policy stays in the orchestrator

pub mod bridge;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::endpoint::EndpointDescriptor;

pub use bridge::LocalNodeBridge;

/// Lifecycle events of the local daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalNodeEvent {
    /// The daemon is up and answering at this endpoint.
    Started(EndpointDescriptor),
    Stopped,
}

#[derive(Debug, Error)]
pub enum LocalNodeError {
    #[error("local node is not managed by this process")]
    Unmanaged,

    #[error("failed to start local node: {0}")]
    StartFailed(String),
}

pub type LocalNodeResult<T> = Result<T, LocalNodeError>;

/// Manager of a daemon process running on this machine.
#[async_trait]
pub trait LocalNode: Send + Sync {
    /// The daemon process is running.
    fn is_online(&self) -> bool;

    /// The daemon process is running and answering RPC.
    fn is_connected(&self) -> bool;

    /// RPC endpoint of the local daemon.
    fn endpoint(&self) -> Option<EndpointDescriptor>;

    async fn start_node(&self) -> LocalNodeResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<LocalNodeEvent>;
}

/// Used when no local daemon is managed: never online, never emits events.
#[derive(Debug)]
pub struct UnmanagedLocalNode {
    events: broadcast::Sender<LocalNodeEvent>,
}

impl UnmanagedLocalNode {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1);
        Self { events }
    }
}

impl Default for UnmanagedLocalNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalNode for UnmanagedLocalNode {
    fn is_online(&self) -> bool {
        false
    }

    fn is_connected(&self) -> bool {
        false
    }

    fn endpoint(&self) -> Option<EndpointDescriptor> {
        None
    }

    async fn start_node(&self) -> LocalNodeResult<()> {
        Err(LocalNodeError::Unmanaged)
    }

    fn subscribe(&self) -> broadcast::Receiver<LocalNodeEvent> {
        self.events.subscribe()
    }
}
