//! Failover policy and adaptive refresh cadence.
//!
//! # Refresh Cadence
//! ```text
//! no active connection            → local period  (5 s)
//! local daemon, catching up       → remote period (20 s)
//! local daemon, caught up         → local period  (5 s)
//! remote daemon, any state        → remote period (20 s)
//! ```
//!
//! A local daemon is cheap to poll while idle but busy while syncing; remote
//! daemons are always polled conservatively.

use std::time::Duration;

use crate::endpoint::EndpointDescriptor;
use crate::health::DaemonSnapshot;

/// How often the health poller runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPeriod {
    /// Derived from the active connection and its last snapshot.
    #[default]
    Adaptive,
    Fixed(Duration),
    /// Only the inline tick after a connection change runs.
    Disabled,
}

impl RefreshPeriod {
    /// Interpret a requested period: `None` or `0` = adaptive, negative = disabled.
    pub fn from_millis(period_ms: Option<i64>) -> Self {
        match period_ms {
            None | Some(0) => RefreshPeriod::Adaptive,
            Some(ms) if ms > 0 => RefreshPeriod::Fixed(Duration::from_millis(ms as u64)),
            Some(_) => RefreshPeriod::Disabled,
        }
    }

    /// Persisted form, the inverse of `from_millis`.
    pub fn as_millis(&self) -> i64 {
        match self {
            RefreshPeriod::Adaptive => 0,
            RefreshPeriod::Fixed(period) => i64::try_from(period.as_millis()).unwrap_or(i64::MAX),
            RefreshPeriod::Disabled => -1,
        }
    }
}

/// Failover settings mirrored to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FailoverPolicy {
    pub auto_switch: bool,
    pub refresh_period: RefreshPeriod,
}

/// The two cadences the adaptive policy chooses between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshCadence {
    pub local: Duration,
    pub remote: Duration,
}

impl Default for RefreshCadence {
    fn default() -> Self {
        Self {
            local: Duration::from_millis(5_000),
            remote: Duration::from_millis(20_000),
        }
    }
}

/// Adaptive refresh period for the given connection state.
pub fn default_refresh_period(
    active: Option<&EndpointDescriptor>,
    snapshot: Option<&DaemonSnapshot>,
    cadence: &RefreshCadence,
) -> Duration {
    match active {
        None => cadence.local,
        Some(endpoint) if endpoint.is_local() => {
            if snapshot.is_some_and(DaemonSnapshot::is_catching_up) {
                cadence.remote
            } else {
                cadence.local
            }
        }
        Some(_) => cadence.remote,
    }
}

/// Period the poller should be scheduled at, or `None` when polling is disabled.
pub fn resolve_period(
    refresh_period: RefreshPeriod,
    active: Option<&EndpointDescriptor>,
    snapshot: Option<&DaemonSnapshot>,
    cadence: &RefreshCadence,
) -> Option<Duration> {
    match refresh_period {
        RefreshPeriod::Adaptive => Some(default_refresh_period(active, snapshot, cadence)),
        RefreshPeriod::Fixed(period) => Some(period),
        RefreshPeriod::Disabled => None,
    }
}
