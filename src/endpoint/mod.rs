//! Endpoint subsystem.
//!
//! # Data Flow
//! ```text
//! Persisted connections + defaults.rs (per-network table)
//!     → pool.rs (ordered candidates, unique by uri, written through to the store)
//!     → selector.rs (probe candidates concurrently, pick best reachable)
//!     → orchestrator applies the choice as the active connection
//! ```
//!
//! # Design Decisions
//! - Selection is stateless; the pool owns liveness metadata
//! - Lower priority number wins; pool order breaks ties deterministically
//! - Priority 1 is reserved for loopback daemons

pub mod defaults;
pub mod descriptor;
pub mod pool;
pub mod selector;

pub use defaults::{default_endpoints, Network};
pub use descriptor::{is_local_uri, EndpointDescriptor, Liveness};
pub use pool::CandidatePool;
pub use selector::ConnectionSelector;
