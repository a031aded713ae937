//! Connection orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! Caller (UI, CLI, trade logic)
//!     → account.rs gate (AccountNotOpen short-circuits)
//!     → service.rs (single lock over pool, active connection, policy)
//!         → endpoint pool/selector for candidates and best-available
//!         → transition: persist → rebind DaemonHandle → restart HealthPoller
//!         → notify subscribers
//!     → status.rs (snapshot + derived observations, lock-free reads)
//!
//! HealthPoller tick failure (scheduled, auto-switch on)
//!     → fail_over → best available → transition
//! ```
//!
//! # Design Decisions
//! - Probes of several candidates run outside the lock
//! - Last write wins between a failover and an explicit switch
//! - A switch to the already-active endpoint still notifies subscribers

pub mod account;
pub mod policy;
pub mod service;
pub mod status;
pub mod types;

pub use account::{AccountGate, AccountState, AlwaysOpen};
pub use policy::{default_refresh_period, FailoverPolicy, RefreshCadence, RefreshPeriod};
pub use service::{Collaborators, ConnectionOrchestrator, OrchestratorSettings, WeakOrchestrator};
pub use status::{ConnectionStatus, StatusReport};
pub use types::{ClientMode, ConnectionChange, ConnectionError, ConnectionResult};
