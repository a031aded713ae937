//! Immutable view of the daemon's sync state.

use serde::Serialize;

use crate::transport::{DaemonInfo, PeerInfo};

/// Daemon state captured by one successful poll. Replaced wholesale, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DaemonSnapshot {
    pub height: u64,
    /// 0 means fully synced with no known target.
    pub target_height: u64,
    pub syncing: bool,
    pub height_without_bootstrap: Option<u64>,
    /// Online peers only.
    pub peers: Vec<PeerInfo>,
}

impl DaemonSnapshot {
    /// Build a snapshot, dropping offline peers.
    pub fn new(info: DaemonInfo, peers: Vec<PeerInfo>) -> Self {
        Self {
            height: info.height,
            target_height: info.target_height,
            syncing: info.busy_syncing,
            height_without_bootstrap: info.height_without_bootstrap,
            peers: peers.into_iter().filter(|p| p.online).collect(),
        }
    }

    /// Height reported to observers: the target while catching up, else the local height.
    pub fn chain_height(&self) -> u64 {
        if self.target_height == 0 {
            self.height
        } else {
            self.target_height
        }
    }

    /// True if the daemon is no more than `tolerance` blocks behind its target.
    pub fn is_synced_within(&self, tolerance: u64) -> bool {
        self.target_height == 0 || self.target_height.saturating_sub(self.height) <= tolerance
    }

    /// True while the daemon is syncing or partially served by a bootstrap daemon.
    pub fn is_catching_up(&self) -> bool {
        let bootstrapping = matches!(
            self.height_without_bootstrap,
            Some(h) if h > 0 && h < self.height
        );
        let behind = self.target_height > 0 && self.height < self.target_height;
        self.syncing || bootstrapping || behind
    }

    /// Fraction of the chain downloaded, in `[0, 1]`.
    pub fn download_fraction(&self) -> f64 {
        if self.target_height == 0 || self.height >= self.target_height {
            1.0
        } else {
            self.height as f64 / self.target_height as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(height: u64, target_height: u64) -> DaemonSnapshot {
        DaemonSnapshot {
            height,
            target_height,
            ..Default::default()
        }
    }

    #[test]
    fn test_sync_tolerance_boundary() {
        assert!(!snapshot(100, 104).is_synced_within(3));
        assert!(snapshot(101, 104).is_synced_within(3));
        assert!(snapshot(5, 0).is_synced_within(3));
        assert!(snapshot(110, 104).is_synced_within(3));
    }

    #[test]
    fn test_chain_height_prefers_target() {
        assert_eq!(snapshot(50, 100).chain_height(), 100);
        assert_eq!(snapshot(50, 0).chain_height(), 50);
    }

    #[test]
    fn test_offline_peers_dropped() {
        let peers = vec![
            PeerInfo { address: "1.1.1.1:18080".into(), online: true },
            PeerInfo { address: "2.2.2.2:18080".into(), online: false },
        ];
        let snapshot = DaemonSnapshot::new(DaemonInfo::default(), peers);
        assert_eq!(snapshot.peers.len(), 1);
        assert_eq!(snapshot.peers[0].address, "1.1.1.1:18080");
    }

    #[test]
    fn test_catching_up() {
        assert!(snapshot(50, 100).is_catching_up());
        assert!(!snapshot(100, 100).is_catching_up());
        assert!(!snapshot(100, 0).is_catching_up());

        let bootstrapped = DaemonSnapshot {
            height: 100,
            height_without_bootstrap: Some(40),
            ..Default::default()
        };
        assert!(bootstrapped.is_catching_up());
    }

    #[test]
    fn test_download_fraction() {
        assert_eq!(snapshot(50, 100).download_fraction(), 0.5);
        assert_eq!(snapshot(100, 0).download_fraction(), 1.0);
    }
}
