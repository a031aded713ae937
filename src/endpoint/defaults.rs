//! Built-in endpoint tables per network.

use serde::{Deserialize, Serialize};

use crate::endpoint::descriptor::EndpointDescriptor;

/// Supported daemon networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Private regtest-style network with only a loopback daemon.
    Local,
    #[default]
    Stagenet,
    Mainnet,
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Local, Network::Stagenet, Network::Mainnet];

    /// Default daemon RPC port on this network.
    pub fn rpc_port(&self) -> u16 {
        match self {
            Network::Local => 28081,
            Network::Stagenet => 38081,
            Network::Mainnet => 18081,
        }
    }

    /// URI of a daemon running on this machine.
    pub fn local_uri(&self) -> String {
        format!("http://127.0.0.1:{}", self.rpc_port())
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Network::Local => "local",
            Network::Stagenet => "stagenet",
            Network::Mainnet => "mainnet",
        };
        f.write_str(name)
    }
}

const STAGENET_REMOTES: &[&str] = &[
    "http://45.63.8.26:38081",
    "http://stagenet.community.rino.io:38081",
    "http://stagenet.melo.tools:38081",
    "http://node.sethforprivacy.com:38089",
    "http://node2.sethforprivacy.com:38089",
    "http://ct36dsbe3oubpbebpxmiqz4uqk6zb6nhmkhoekileo4fts23rvuse2qd.onion:38081",
];

const MAINNET_REMOTES: &[&str] = &[
    "http://node.community.rino.io:18081",
    "http://xmr-node.cakewallet.com:18081",
    "http://xmr-node-eu.cakewallet.com:18081",
    "http://xmr-node-usa-east.cakewallet.com:18081",
    "http://xmr-node-uk.cakewallet.com:18081",
    "http://node.sethforprivacy.com:18089",
];

/// Built-in candidates for `network`, loopback daemon first at priority 1.
///
/// The loopback entry uses `127.0.0.1` rather than `localhost` so it matches
/// the URI a locally managed daemon reports.
pub fn default_endpoints(network: Network) -> Vec<EndpointDescriptor> {
    let remotes: &[&str] = match network {
        Network::Local => &[],
        Network::Stagenet => STAGENET_REMOTES,
        Network::Mainnet => MAINNET_REMOTES,
    };

    std::iter::once(EndpointDescriptor::new(network.local_uri()).with_priority(1))
        .chain(remotes.iter().map(|uri| EndpointDescriptor::new(*uri).with_priority(2)))
        .collect()
}
