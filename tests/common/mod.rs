//! Shared fakes and mock daemons for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use daemon_connections::endpoint::EndpointDescriptor;
use daemon_connections::local_node::{LocalNode, LocalNodeEvent, LocalNodeResult};
use daemon_connections::orchestrator::{
    AccountState, ClientMode, Collaborators, ConnectionChange, ConnectionOrchestrator,
    OrchestratorSettings,
};
use daemon_connections::store::{MemoryStore, PersistedConnections};
use daemon_connections::transport::{
    DaemonInfo, DaemonTransport, PeerInfo, TransportError, TransportResult,
};

/// Programmable transport. Endpoints are unreachable until marked otherwise.
#[derive(Default)]
pub struct FakeTransport {
    reachable: Mutex<HashMap<String, bool>>,
    info: Mutex<HashMap<String, DaemonInfo>>,
    peers: Mutex<HashMap<String, Vec<PeerInfo>>>,
    info_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, uri: &str, reachable: bool) {
        self.reachable.lock().unwrap().insert(uri.to_string(), reachable);
    }

    pub fn set_info(&self, uri: &str, height: u64, target_height: u64) {
        self.info.lock().unwrap().insert(
            uri.to_string(),
            DaemonInfo {
                height,
                target_height,
                ..Default::default()
            },
        );
    }

    pub fn set_peers(&self, uri: &str, peers: Vec<PeerInfo>) {
        self.peers.lock().unwrap().insert(uri.to_string(), peers);
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    fn is_reachable(&self, uri: &str) -> bool {
        self.reachable.lock().unwrap().get(uri).copied().unwrap_or(false)
    }

    fn refused(uri: &str) -> TransportError {
        TransportError::Http {
            uri: uri.to_string(),
            message: "connection refused".into(),
        }
    }
}

#[async_trait]
impl DaemonTransport for FakeTransport {
    async fn probe(
        &self,
        endpoint: &EndpointDescriptor,
        _timeout: Duration,
    ) -> TransportResult<Duration> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_reachable(&endpoint.uri) {
            Ok(Duration::from_millis(3))
        } else {
            Err(Self::refused(&endpoint.uri))
        }
    }

    async fn fetch_daemon_info(&self, endpoint: &EndpointDescriptor) -> TransportResult<DaemonInfo> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_reachable(&endpoint.uri) {
            return Err(Self::refused(&endpoint.uri));
        }
        Ok(self
            .info
            .lock()
            .unwrap()
            .get(&endpoint.uri)
            .cloned()
            .unwrap_or(DaemonInfo {
                height: 100,
                ..Default::default()
            }))
    }

    async fn fetch_peers(&self, endpoint: &EndpointDescriptor) -> TransportResult<Vec<PeerInfo>> {
        self.peers
            .lock()
            .unwrap()
            .get(&endpoint.uri)
            .cloned()
            .ok_or_else(|| TransportError::Rpc {
                uri: endpoint.uri.clone(),
                message: "restricted".into(),
            })
    }
}

/// Local node whose state and events are driven by the test.
pub struct FakeLocalNode {
    endpoint: EndpointDescriptor,
    online: AtomicBool,
    connected: AtomicBool,
    start_calls: AtomicUsize,
    events: broadcast::Sender<LocalNodeEvent>,
}

impl FakeLocalNode {
    pub fn new(uri: &str) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            endpoint: EndpointDescriptor::new(uri).with_priority(1),
            online: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            start_calls: AtomicUsize::new(0),
            events,
        }
    }

    pub fn set_running(&self, running: bool) {
        self.online.store(running, Ordering::SeqCst);
        self.connected.store(running, Ordering::SeqCst);
    }

    pub fn emit(&self, event: LocalNodeEvent) {
        self.events.send(event).unwrap();
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn endpoint_descriptor(&self) -> EndpointDescriptor {
        self.endpoint.clone()
    }
}

#[async_trait]
impl LocalNode for FakeLocalNode {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn endpoint(&self) -> Option<EndpointDescriptor> {
        Some(self.endpoint.clone())
    }

    async fn start_node(&self) -> LocalNodeResult<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<LocalNodeEvent> {
        self.events.subscribe()
    }
}

pub const LOCAL: &str = "http://127.0.0.1:38081";
pub const REMOTE_A: &str = "http://node-a.example.org:38081";
pub const REMOTE_B: &str = "http://node-b.example.org:38081";
pub const REMOTE_C: &str = "http://node-c.example.org:38081";

/// Everything a test needs to drive one orchestrator.
pub struct Harness {
    pub orchestrator: ConnectionOrchestrator,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<FakeTransport>,
    pub local_node: Arc<FakeLocalNode>,
    pub account: Arc<AccountState>,
}

/// API-mode settings over the given built-in candidates.
pub fn settings(defaults: Vec<EndpointDescriptor>) -> OrchestratorSettings {
    let mut settings = OrchestratorSettings::default();
    settings.default_endpoints = defaults;
    settings.mode = ClientMode::Api;
    settings.probe_timeout = Duration::from_millis(200);
    settings
}

/// Local daemon at priority 1 plus remotes A and B at priority 2.
pub fn standard_defaults() -> Vec<EndpointDescriptor> {
    vec![
        EndpointDescriptor::new(LOCAL).with_priority(1),
        EndpointDescriptor::new(REMOTE_A).with_priority(2),
        EndpointDescriptor::new(REMOTE_B).with_priority(2),
    ]
}

pub fn harness(settings: OrchestratorSettings, persisted: PersistedConnections) -> Harness {
    let store = Arc::new(MemoryStore::with_state(persisted));
    let transport = Arc::new(FakeTransport::new());
    let local_node = Arc::new(FakeLocalNode::new(LOCAL));
    let account = Arc::new(AccountState::new(true));

    let collaborators = Collaborators {
        store: store.clone(),
        transport: transport.clone(),
        account: account.clone(),
        local_node: local_node.clone(),
    };

    Harness {
        orchestrator: ConnectionOrchestrator::new(settings, collaborators),
        store,
        transport,
        local_node,
        account,
    }
}

/// Wait for the next connection change.
pub async fn next_change(rx: &mut broadcast::Receiver<ConnectionChange>) -> ConnectionChange {
    tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("timed out waiting for connection change")
        .expect("connection change channel closed")
}

/// A request received by the mock daemon.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Lowercased header block.
    pub headers: String,
    /// JSON-RPC method name.
    pub method: String,
}

/// Start a mock daemon on an ephemeral port. `handler` maps each request to
/// an HTTP status and a response body.
pub async fn start_mock_daemon<F>(handler: F) -> SocketAddr
where
    F: Fn(&MockRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = handler(&request);
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Canned monerod-style responses.
pub fn daemon_response(request: &MockRequest, height: u64, target_height: u64) -> (u16, String) {
    let result = match request.method.as_str() {
        "get_version" => serde_json::json!({ "version": 196613, "status": "OK" }),
        "get_info" => serde_json::json!({
            "height": height,
            "target_height": target_height,
            "busy_syncing": false,
            "status": "OK",
        }),
        "get_connections" => serde_json::json!({
            "connections": [
                { "address": "10.0.0.1:18080", "state": "normal" },
                { "address": "10.0.0.2:18080", "state": "before_handshake" },
            ]
        }),
        _ => {
            let body = serde_json::json!({
                "jsonrpc": "2.0",
                "id": "0",
                "error": { "code": -32601, "message": "Method not found" },
            });
            return (200, body.to_string());
        }
    };
    let body = serde_json::json!({ "jsonrpc": "2.0", "id": "0", "result": result });
    (200, body.to_string())
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body: serde_json::Value =
        serde_json::from_slice(&buf[body_start..body_start + content_length]).ok()?;
    let method = body.get("method")?.as_str()?.to_string();
    Some(MockRequest { headers, method })
}
