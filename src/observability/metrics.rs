//! Metrics collection and exposition.
//!
//! # Metrics
//! - `daemon_chain_height` (gauge): chain height of the active daemon
//! - `daemon_peers` (gauge): online peers of the active daemon
//! - `daemon_endpoint_reachable` (gauge, `uri`): 1=reachable, 0=unreachable
//! - `daemon_connection_changes_total` (counter): active connection transitions
//! - `daemon_poll_failures_total` (counter): failed health poll ticks
//! - `daemon_failovers_total` (counter): automatic switches after poll failures

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_chain_height(height: u64) {
    ::metrics::gauge!("daemon_chain_height").set(height as f64);
}

pub fn record_peer_count(peers: usize) {
    ::metrics::gauge!("daemon_peers").set(peers as f64);
}

pub fn record_endpoint_reachable(uri: &str, reachable: bool) {
    let value = if reachable { 1.0 } else { 0.0 };
    ::metrics::gauge!("daemon_endpoint_reachable", "uri" => uri.to_string()).set(value);
}

pub fn record_connection_change() {
    ::metrics::counter!("daemon_connection_changes_total").increment(1);
}

pub fn record_poll_failure() {
    ::metrics::counter!("daemon_poll_failures_total").increment(1);
}

pub fn record_failover() {
    ::metrics::counter!("daemon_failovers_total").increment(1);
}
