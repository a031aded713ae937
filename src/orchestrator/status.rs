//! Observation interface for UI and other consumers.
//!
//! # Responsibilities
//! - Hold the latest `DaemonSnapshot` behind an atomic pointer swap
//! - Derive peer count, chain height and download progress from each snapshot
//! - Answer "enough peers to broadcast?" without taking the orchestrator lock

use arc_swap::{ArcSwap, ArcSwapOption};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::endpoint::EndpointDescriptor;
use crate::health::DaemonSnapshot;
use crate::observability::metrics as telemetry;
use crate::transport::PeerInfo;

/// Lock-free view of the active daemon's health.
pub struct ConnectionStatus {
    snapshot: ArcSwapOption<DaemonSnapshot>,
    peers: ArcSwap<Vec<PeerInfo>>,
    num_peers: AtomicUsize,
    chain_height: AtomicU64,
    /// `f64` bits.
    download_fraction: AtomicU64,
    download_done: AtomicBool,
    min_broadcast_connections: usize,
}

impl ConnectionStatus {
    pub fn new(min_broadcast_connections: usize) -> Self {
        Self {
            snapshot: ArcSwapOption::empty(),
            peers: ArcSwap::from_pointee(Vec::new()),
            num_peers: AtomicUsize::new(0),
            chain_height: AtomicU64::new(0),
            download_fraction: AtomicU64::new(0f64.to_bits()),
            download_done: AtomicBool::new(false),
            min_broadcast_connections,
        }
    }

    /// Replace the snapshot and everything derived from it.
    pub(crate) fn apply_snapshot(&self, snapshot: DaemonSnapshot) {
        let chain_height = snapshot.chain_height();
        let peers = snapshot.peers.clone();

        self.chain_height.store(chain_height, Ordering::SeqCst);
        self.num_peers.store(peers.len(), Ordering::SeqCst);
        if !self.download_done.load(Ordering::SeqCst) {
            self.download_fraction
                .store(snapshot.download_fraction().to_bits(), Ordering::SeqCst);
        }

        telemetry::record_chain_height(chain_height);
        telemetry::record_peer_count(peers.len());

        self.peers.store(Arc::new(peers));
        self.snapshot.store(Some(Arc::new(snapshot)));
    }

    /// Drop peer visibility after a failed poll. The last snapshot is kept.
    pub(crate) fn clear_peers(&self) {
        self.peers.store(Arc::new(Vec::new()));
        self.num_peers.store(0, Ordering::SeqCst);
        telemetry::record_peer_count(0);
    }

    /// Forget everything, e.g. when the active connection is cleared.
    pub(crate) fn reset(&self) {
        self.snapshot.store(None);
        self.clear_peers();
    }

    pub fn snapshot(&self) -> Option<Arc<DaemonSnapshot>> {
        self.snapshot.load_full()
    }

    pub fn peers(&self) -> Vec<PeerInfo> {
        (*self.peers.load_full()).clone()
    }

    pub fn num_peers(&self) -> usize {
        self.num_peers.load(Ordering::SeqCst)
    }

    pub fn chain_height(&self) -> u64 {
        self.chain_height.load(Ordering::SeqCst)
    }

    /// Download progress in `[0.0, 1.0]`.
    pub fn download_percentage(&self) -> f64 {
        f64::from_bits(self.download_fraction.load(Ordering::SeqCst))
    }

    pub fn is_download_complete(&self) -> bool {
        self.download_done.load(Ordering::SeqCst) || self.download_percentage() >= 1.0
    }

    /// Mark the initial download finished; progress stays at 1.0 from now on.
    pub fn done_download(&self) {
        self.download_done.store(true, Ordering::SeqCst);
        self.download_fraction.store(1f64.to_bits(), Ordering::SeqCst);
    }

    pub fn min_broadcast_connections(&self) -> usize {
        self.min_broadcast_connections
    }

    pub fn has_sufficient_peers_for_broadcast(&self) -> bool {
        self.num_peers() >= self.min_broadcast_connections
    }

    pub fn report(&self, connection: Option<EndpointDescriptor>) -> StatusReport {
        StatusReport {
            connection: connection.map(|c| c.uri),
            chain_height: self.chain_height(),
            num_peers: self.num_peers(),
            download_percentage: self.download_percentage(),
            sufficient_peers: self.has_sufficient_peers_for_broadcast(),
            snapshot: self.snapshot().map(|s| s.as_ref().clone()),
        }
    }
}

impl std::fmt::Debug for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionStatus")
            .field("chain_height", &self.chain_height())
            .field("num_peers", &self.num_peers())
            .field("download_percentage", &self.download_percentage())
            .finish()
    }
}

/// Serializable point-in-time view, printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub connection: Option<String>,
    pub chain_height: u64,
    pub num_peers: usize,
    pub download_percentage: f64,
    pub sufficient_peers: bool,
    pub snapshot: Option<DaemonSnapshot>,
}
