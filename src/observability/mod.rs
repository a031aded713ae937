//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! orchestrator + health poller produce:
//!     → logging.rs (structured log events, env-filtered)
//!     → metrics.rs (chain height, peers, reachability, switch/failure counters)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metric updates are fire-and-forget; without an installed recorder they are no-ops
//! - `RUST_LOG` overrides the configured log level

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
