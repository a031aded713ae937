//! Daemon transport subsystem.
//!
//! # Data Flow
//! ```text
//! EndpointDescriptor (uri, credentials)
//!     → client.rs (JSON-RPC over HTTP with timeouts)
//!     → daemon.rs (handle bound to the active endpoint)
//!     → DaemonInfo / PeerInfo consumed by the health poller
//! ```
//!
//! # Design Decisions
//! - The orchestrator only sees the `DaemonTransport` trait; tests swap in fakes
//! - Every request carries a deadline
//! - Credentials are sent as HTTP basic auth and never logged

pub mod client;
pub mod daemon;
pub mod types;

pub use client::{DaemonTransport, JsonRpcTransport};
pub use daemon::DaemonHandle;
pub use types::{DaemonInfo, PeerInfo, TransportError, TransportResult};
