//! Endpoint descriptor abstraction.
//!
//! # Responsibilities
//! - Represent a single daemon RPC target (uri, credentials, priority)
//! - Track the outcome of the most recent liveness probe
//! - Classify endpoints as local (loopback) or remote

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::{Host, Url};

/// Outcome of the most recent probe against an endpoint.
///
/// Liveness is runtime-only state and is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Liveness {
    /// `None` until the endpoint has been probed at least once.
    pub reachable: Option<bool>,
    /// Round-trip time of the last successful probe.
    pub latency: Option<Duration>,
    /// Error message of the last failed probe.
    pub last_error: Option<String>,
}

impl Liveness {
    /// Liveness after a successful probe.
    pub fn reachable(latency: Duration) -> Self {
        Self {
            reachable: Some(true),
            latency: Some(latency),
            last_error: None,
        }
    }

    /// Liveness after a failed probe.
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            reachable: Some(false),
            latency: None,
            last_error: Some(error.into()),
        }
    }
}

/// A single daemon RPC endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Endpoint URI, unique within a candidate pool.
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Lower values are preferred. Priority 1 is reserved for loopback daemons.
    #[serde(default)]
    pub priority: u32,
    #[serde(skip)]
    pub liveness: Liveness,
}

impl EndpointDescriptor {
    /// Create a descriptor with no credentials and priority 0.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            username: None,
            password: None,
            priority: 0,
            liveness: Liveness::default(),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_credentials(
        mut self,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        self.username = username.filter(|u| !u.is_empty());
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    /// Parse the URI, rejecting anything that is not an absolute URL.
    pub fn parse_uri(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.uri)
    }

    /// True if the endpoint points at a loopback address.
    pub fn is_local(&self) -> bool {
        is_local_uri(&self.uri)
    }

    /// True if the last probe succeeded.
    pub fn is_reachable(&self) -> bool {
        self.liveness.reachable == Some(true)
    }
}

impl std::fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("priority", &self.priority)
            .field("liveness", &self.liveness)
            .finish()
    }
}

/// True if `uri` parses and its host is a loopback address or `localhost`.
pub fn is_local_uri(uri: &str) -> bool {
    let Ok(url) = Url::parse(uri) else {
        return false;
    };
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
