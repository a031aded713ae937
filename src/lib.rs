//! Daemon connection management: candidate endpoints, best-available
//! selection, automatic failover and health polling of the active daemon.

pub mod config;
pub mod endpoint;
pub mod health;
pub mod local_node;
pub mod orchestrator;
pub mod store;
pub mod transport;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::DaemonConfig;
pub use endpoint::{EndpointDescriptor, Network};
pub use lifecycle::Shutdown;
pub use orchestrator::{ConnectionError, ConnectionOrchestrator, OrchestratorSettings};
