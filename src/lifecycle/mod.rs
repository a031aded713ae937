//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Broadcast stop signal → pollers and bridges leave their loops
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → CLI stops the orchestrator and exits
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
