//! Daemon health polling subsystem.
//!
//! # Data Flow
//! ```text
//! poller.rs (inline tick, then periodic timer)
//!     → fetch get_info + get_connections through the active daemon handle
//!     → success: snapshot.rs (new DaemonSnapshot, swapped in atomically)
//!     → failure: error_log.rs (rate-limited warning) → orchestrator failover
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable and replaced wholesale
//! - Stopping a poller never interrupts an in-flight tick
//! - Peer-list failures do not fail the poll; peers fall back to empty

pub mod error_log;
pub mod poller;
pub mod snapshot;

pub use error_log::ErrorRateLimiter;
pub use poller::{HealthPoller, Tick, TickFn};
pub use snapshot::DaemonSnapshot;
