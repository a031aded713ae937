//! Connection orchestrator.
//!
//! # Responsibilities
//! - Own the candidate pool, the active connection and the failover policy
//! - Serialize every mutation under one async lock
//! - Restart the health poller on each connection change
//! - Fail over to the best available endpoint when polling fails and
//!   auto-switch is on

use arc_swap::ArcSwapOption;
use futures_util::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::config::DaemonConfig;
use crate::endpoint::{
    default_endpoints, is_local_uri, CandidatePool, ConnectionSelector, EndpointDescriptor,
    Liveness, Network,
};
use crate::health::{DaemonSnapshot, ErrorRateLimiter, HealthPoller, Tick, TickFn};
use crate::local_node::{LocalNode, LocalNodeBridge};
use crate::observability::metrics as telemetry;
use crate::orchestrator::account::AccountGate;
use crate::orchestrator::policy::{
    default_refresh_period, resolve_period, FailoverPolicy, RefreshCadence, RefreshPeriod,
};
use crate::orchestrator::status::ConnectionStatus;
use crate::orchestrator::types::{ClientMode, ConnectionChange, ConnectionError, ConnectionResult};
use crate::store::ConnectionStore;
use crate::transport::{DaemonHandle, DaemonTransport, TransportResult};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// External services the orchestrator depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ConnectionStore>,
    pub transport: Arc<dyn DaemonTransport>,
    pub account: Arc<dyn AccountGate>,
    pub local_node: Arc<dyn LocalNode>,
}

/// Static tuning, fixed at construction.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Built-in candidates merged into the pool on every initialization.
    pub default_endpoints: Vec<EndpointDescriptor>,
    /// Endpoint supplied by the operator, applied on first initialization only.
    pub configured_endpoint: Option<EndpointDescriptor>,
    pub mode: ClientMode,
    pub cadence: RefreshCadence,
    pub probe_timeout: Duration,
    pub error_log_window: Duration,
    pub failures_before_switch: u32,
    pub sync_tolerance_blocks: u64,
    pub min_broadcast_connections: usize,
}

impl OrchestratorSettings {
    pub fn for_network(network: Network) -> Self {
        Self {
            default_endpoints: default_endpoints(network),
            configured_endpoint: None,
            mode: ClientMode::Desktop,
            cadence: RefreshCadence::default(),
            probe_timeout: Duration::from_secs(10),
            error_log_window: Duration::from_secs(300),
            failures_before_switch: 1,
            sync_tolerance_blocks: 3,
            min_broadcast_connections: 0,
        }
    }

    pub fn from_config(config: &DaemonConfig) -> Self {
        let polling = &config.polling;
        Self {
            default_endpoints: default_endpoints(config.network),
            configured_endpoint: config.node.endpoint(),
            mode: config.mode,
            cadence: RefreshCadence {
                local: Duration::from_millis(polling.local_refresh_ms),
                remote: Duration::from_millis(polling.remote_refresh_ms),
            },
            probe_timeout: Duration::from_millis(polling.probe_timeout_ms),
            error_log_window: Duration::from_secs(polling.error_log_window_secs),
            failures_before_switch: polling.failures_before_switch,
            sync_tolerance_blocks: polling.sync_tolerance_blocks,
            min_broadcast_connections: config.peers.min_broadcast_connections,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::for_network(Network::default())
    }
}

/// State guarded by the orchestrator lock.
struct State {
    pool: CandidatePool,
    active: Option<EndpointDescriptor>,
    daemon: Option<DaemonHandle>,
    policy: FailoverPolicy,
    poller: Option<HealthPoller>,
    bridge: Option<JoinHandle<()>>,
    initialized: bool,
}

impl State {
    /// Active endpoint answered its last probe.
    fn is_connected(&self) -> bool {
        self.active.as_ref().is_some_and(EndpointDescriptor::is_reachable)
    }

    fn active_uri(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.uri.as_str())
    }

    /// Store a probe outcome on the pool entry and on the active copy.
    fn record_liveness(&mut self, uri: &str, liveness: Liveness) -> Option<EndpointDescriptor> {
        self.pool.record_liveness(uri, liveness.clone());
        if let Some(active) = self.active.as_mut().filter(|a| a.uri == uri) {
            active.liveness = liveness;
        }
        self.active.clone()
    }
}

impl Drop for State {
    fn drop(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            bridge.abort();
        }
    }
}

struct Inner {
    settings: OrchestratorSettings,
    collaborators: Collaborators,
    selector: ConnectionSelector,
    state: Mutex<State>,
    status: ConnectionStatus,
    /// Mirror of `State::active`'s uri, readable from ticks without the lock.
    active_uri: ArcSwapOption<String>,
    error_log: StdMutex<ErrorRateLimiter>,
    consecutive_failures: AtomicU32,
    changes: broadcast::Sender<ConnectionChange>,
}

/// Handle to the connection orchestrator. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct ConnectionOrchestrator {
    inner: Arc<Inner>,
}

/// Non-owning handle used by background tasks.
#[derive(Clone)]
pub struct WeakOrchestrator {
    inner: Weak<Inner>,
}

impl WeakOrchestrator {
    pub fn upgrade(&self) -> Option<ConnectionOrchestrator> {
        self.inner.upgrade().map(|inner| ConnectionOrchestrator { inner })
    }
}

impl ConnectionOrchestrator {
    pub fn new(settings: OrchestratorSettings, collaborators: Collaborators) -> Self {
        let selector =
            ConnectionSelector::new(collaborators.transport.clone(), settings.probe_timeout);
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let state = State {
            pool: CandidatePool::new(collaborators.store.clone()),
            active: None,
            daemon: None,
            policy: FailoverPolicy::default(),
            poller: None,
            bridge: None,
            initialized: false,
        };

        Self {
            inner: Arc::new(Inner {
                status: ConnectionStatus::new(settings.min_broadcast_connections),
                active_uri: ArcSwapOption::empty(),
                error_log: StdMutex::new(ErrorRateLimiter::new(settings.error_log_window)),
                consecutive_failures: AtomicU32::new(0),
                state: Mutex::new(state),
                selector,
                settings,
                collaborators,
                changes,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakOrchestrator {
        WeakOrchestrator {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn ensure_open(&self) -> ConnectionResult<()> {
        if self.inner.collaborators.account.is_open() {
            Ok(())
        } else {
            Err(ConnectionError::AccountNotOpen)
        }
    }

    /// Load candidates, restore preferences and pick the active connection.
    ///
    /// Safe to call again, e.g. after credentials change; the local node
    /// listener is registered only once.
    pub async fn initialize(&self) -> ConnectionResult<()> {
        self.ensure_open()?;
        let mut state = self.inner.state.lock().await;
        self.inner.initialize(&mut state).await
    }

    pub async fn on_account_opened(&self) -> ConnectionResult<()> {
        tracing::info!("Account opened, initializing connections");
        self.initialize().await
    }

    /// Daemon handle bound to the active connection.
    pub async fn daemon(&self) -> ConnectionResult<Option<DaemonHandle>> {
        self.ensure_open()?;
        Ok(self.inner.state.lock().await.daemon.clone())
    }

    /// Add a candidate. Fails if its uri is already in the pool.
    pub async fn add_connection(&self, endpoint: EndpointDescriptor) -> ConnectionResult<()> {
        self.ensure_open()?;
        validate_uri(&endpoint)?;
        let mut state = self.inner.state.lock().await;
        state.pool.add(endpoint)
    }

    /// Remove a candidate. Removing the active one leaves no active connection.
    pub async fn remove_connection(&self, uri: &str) -> ConnectionResult<()> {
        self.ensure_open()?;
        let mut state = self.inner.state.lock().await;
        if state.pool.remove(uri)?.is_none() {
            return Ok(());
        }
        if state.active_uri() == Some(uri) {
            tracing::info!(uri, "Removed the active connection");
            self.inner.transition(&mut state, None).await?;
        }
        Ok(())
    }

    pub async fn get_connection(&self) -> ConnectionResult<Option<EndpointDescriptor>> {
        self.ensure_open()?;
        Ok(self.inner.state.lock().await.active.clone())
    }

    pub async fn get_connections(&self) -> ConnectionResult<Vec<EndpointDescriptor>> {
        self.ensure_open()?;
        Ok(self.inner.state.lock().await.pool.list())
    }

    /// Switch to a candidate already in the pool.
    pub async fn set_connection_uri(&self, uri: &str) -> ConnectionResult<()> {
        self.ensure_open()?;
        let mut state = self.inner.state.lock().await;
        let endpoint = state
            .pool
            .get(uri)
            .cloned()
            .ok_or_else(|| ConnectionError::UnknownEndpoint(uri.to_string()))?;
        self.inner.transition(&mut state, Some(endpoint)).await
    }

    /// Switch to `endpoint`, adding or refreshing it in the pool.
    ///
    /// Switching to the already-active endpoint still runs the full transition
    /// and notifies subscribers.
    pub async fn set_connection(&self, endpoint: EndpointDescriptor) -> ConnectionResult<()> {
        self.ensure_open()?;
        validate_uri(&endpoint)?;
        let mut state = self.inner.state.lock().await;
        self.inner.transition(&mut state, Some(endpoint)).await
    }

    /// Probe the active connection. Never switches; a failed probe is returned
    /// as a transport error.
    pub async fn check_connection(&self) -> ConnectionResult<Option<EndpointDescriptor>> {
        self.ensure_open()?;
        let Some(active) = self.inner.state.lock().await.active.clone() else {
            return Ok(None);
        };

        let result = self.inner.selector.probe(&active).await;
        telemetry::record_endpoint_reachable(&active.uri, result.is_ok());
        let liveness = match &result {
            Ok(latency) => Liveness::reachable(*latency),
            Err(e) => Liveness::unreachable(e.to_string()),
        };
        let updated = self
            .inner
            .state
            .lock()
            .await
            .record_liveness(&active.uri, liveness);

        result?;
        Ok(updated)
    }

    /// Probe every candidate and record the outcomes.
    pub async fn check_connections(&self) -> ConnectionResult<Vec<EndpointDescriptor>> {
        self.ensure_open()?;
        let candidates = self.inner.state.lock().await.pool.list();
        let probed = self.inner.selector.probe_all(&candidates).await;

        let mut state = self.inner.state.lock().await;
        for endpoint in &probed {
            telemetry::record_endpoint_reachable(&endpoint.uri, endpoint.is_reachable());
            state.record_liveness(&endpoint.uri, endpoint.liveness.clone());
        }
        Ok(probed)
    }

    /// Best reachable candidate. Does not switch.
    pub async fn get_best_available_connection(
        &self,
    ) -> ConnectionResult<Option<EndpointDescriptor>> {
        self.ensure_open()?;
        let candidates = self.inner.state.lock().await.pool.list();
        Ok(self.inner.selector.best_available(&candidates).await)
    }

    /// Restart polling. `None` or `0` polls at the adaptive period, a negative
    /// value disables scheduled polling.
    ///
    /// The period is persisted but only governs the current poller; the next
    /// connection change polls at the adaptive period again.
    pub async fn start_checking_connection(&self, period_ms: Option<i64>) -> ConnectionResult<()> {
        self.ensure_open()?;
        let refresh_period = RefreshPeriod::from_millis(period_ms);
        let mut state = self.inner.state.lock().await;
        self.inner
            .collaborators
            .store
            .set_refresh_period(refresh_period.as_millis())?;
        state.policy.refresh_period = refresh_period;
        self.inner.restart_poller(&mut state, refresh_period).await;
        Ok(())
    }

    pub async fn stop_checking_connection(&self) -> ConnectionResult<()> {
        self.ensure_open()?;
        let mut state = self.inner.state.lock().await;
        self.inner
            .collaborators
            .store
            .set_refresh_period(RefreshPeriod::Disabled.as_millis())?;
        state.policy.refresh_period = RefreshPeriod::Disabled;
        if let Some(poller) = state.poller.take() {
            poller.stop();
        }
        tracing::info!("Stopped checking connection");
        Ok(())
    }

    pub async fn set_auto_switch(&self, auto_switch: bool) -> ConnectionResult<()> {
        self.ensure_open()?;
        let mut state = self.inner.state.lock().await;
        self.inner.collaborators.store.set_auto_switch(auto_switch)?;
        state.policy.auto_switch = auto_switch;
        Ok(())
    }

    pub async fn get_auto_switch(&self) -> ConnectionResult<bool> {
        self.ensure_open()?;
        Ok(self.inner.state.lock().await.policy.auto_switch)
    }

    pub async fn get_refresh_period(&self) -> ConnectionResult<RefreshPeriod> {
        self.ensure_open()?;
        Ok(self.inner.state.lock().await.policy.refresh_period)
    }

    pub async fn is_connection_local(&self) -> ConnectionResult<bool> {
        self.ensure_open()?;
        let state = self.inner.state.lock().await;
        Ok(state.active.as_ref().is_some_and(EndpointDescriptor::is_local))
    }

    /// Adaptive refresh period for the current connection state.
    pub async fn default_refresh_period_ms(&self) -> ConnectionResult<u64> {
        self.ensure_open()?;
        let state = self.inner.state.lock().await;
        let snapshot = self.inner.status.snapshot();
        let period = default_refresh_period(
            state.active.as_ref(),
            snapshot.as_deref(),
            &self.inner.settings.cadence,
        );
        Ok(period.as_millis() as u64)
    }

    /// Latest daemon snapshot, if any poll has succeeded.
    pub async fn last_info(&self) -> ConnectionResult<Option<Arc<DaemonSnapshot>>> {
        self.ensure_open()?;
        Ok(self.inner.status.snapshot())
    }

    /// False without an active connection or before the first successful poll.
    pub async fn is_synced_within_tolerance(&self) -> ConnectionResult<bool> {
        self.ensure_open()?;
        let connected = self.inner.state.lock().await.active.is_some();
        let Some(snapshot) = self.inner.status.snapshot().filter(|_| connected) else {
            return Ok(false);
        };

        let synced = snapshot.is_synced_within(self.inner.settings.sync_tolerance_blocks);
        if !synced {
            tracing::warn!(
                height = snapshot.height,
                target_height = snapshot.target_height,
                tolerance = self.inner.settings.sync_tolerance_blocks,
                "Daemon is not synced within tolerance"
            );
        }
        Ok(synced)
    }

    /// Fail unless there is an active connection that is synced within tolerance.
    pub async fn verify_connection(&self) -> ConnectionResult<()> {
        if self.get_connection().await?.is_none() {
            return Err(ConnectionError::NoConnection);
        }
        if !self.is_synced_within_tolerance().await? {
            let (height, target_height) = self
                .inner
                .status
                .snapshot()
                .map_or((0, 0), |s| (s.height, s.target_height));
            return Err(ConnectionError::NotSynced {
                height,
                target_height,
            });
        }
        Ok(())
    }

    /// Observation interface.
    ///
    /// Not account-gated: it exposes no candidate or credential data, and a UI
    /// must be able to render connection health before the account opens.
    pub fn status(&self) -> &ConnectionStatus {
        &self.inner.status
    }

    /// Connection changes, delivered after the new state is in place.
    ///
    /// Not account-gated, so listeners can be registered before the account
    /// opens. Only changes made through gated operations or failover are sent.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionChange> {
        self.inner.changes.subscribe()
    }

    /// Stop polling and the local node listener.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(poller) = state.poller.take() {
            poller.stop();
        }
        if let Some(bridge) = state.bridge.take() {
            bridge.abort();
        }
        tracing::info!("Connection orchestrator stopped");
    }

    pub(crate) async fn probe_endpoint(
        &self,
        endpoint: &EndpointDescriptor,
    ) -> TransportResult<Duration> {
        self.inner.selector.probe(endpoint).await
    }

    /// Switch away from `failed_uri` if auto-switch is on and it is still active.
    pub(crate) fn fail_over(&self, failed_uri: Option<String>) -> BoxFuture<'static, ()> {
        self.inner.fail_over(failed_uri)
    }
}

impl std::fmt::Debug for ConnectionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOrchestrator")
            .field("settings", &self.inner.settings)
            .field("status", &self.inner.status)
            .finish()
    }
}

impl Inner {
    fn error_log(&self) -> MutexGuard<'_, ErrorRateLimiter> {
        self.error_log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn initialize(self: &Arc<Self>, state: &mut State) -> ConnectionResult<()> {
        let store = &self.collaborators.store;
        let local_node = &self.collaborators.local_node;

        if let Some(poller) = state.poller.take() {
            poller.stop();
        }
        state.pool.clear();
        state.active = None;
        state.daemon = None;
        self.status.reset();

        let persisted = store.load()?;
        for endpoint in persisted.connections {
            state.pool.restore(endpoint);
        }
        tracing::info!(count = state.pool.len(), "Read connections from store");

        for endpoint in &self.settings.default_endpoints {
            state.pool.add_if_absent(endpoint.clone())?;
        }

        let current_uri = persisted.current_uri;
        if let Some(uri) = current_uri.as_deref() {
            match state.pool.get(uri) {
                Some(endpoint) => state.active = Some(endpoint.clone()),
                None => tracing::warn!(uri, "Last used connection is no longer a candidate"),
            }
        }

        if !state.initialized {
            if let Some(configured) = &self.settings.configured_endpoint {
                state.pool.upsert(configured.clone())?;
                state.active = Some(configured.clone());
            }
        }

        state.policy = FailoverPolicy {
            auto_switch: persisted.auto_switch,
            refresh_period: RefreshPeriod::from_millis(Some(persisted.refresh_period_ms)),
        };
        if let Some(active) = state.active.clone() {
            let liveness = self.probe_liveness(&active).await;
            state.record_liveness(&active.uri, liveness);
        }

        if !state.initialized {
            let weak = WeakOrchestrator {
                inner: Arc::downgrade(self),
            };
            state.bridge = Some(LocalNodeBridge::spawn(weak, local_node.subscribe()));
            state.initialized = true;
        }

        if let Some(uri) = current_uri.as_deref() {
            if !state.is_connected() && is_local_uri(uri) && !local_node.is_online() {
                tracing::info!(uri, "Last connection was local, starting local node");
                if let Err(e) = local_node.start_node().await {
                    tracing::warn!(error = %e, "Unable to start local node");
                }
            }
        }

        let configured = self.settings.configured_endpoint.as_ref();
        if configured.map_or(true, EndpointDescriptor::is_local)
            && (!state.is_connected() || state.policy.auto_switch)
            && local_node.is_connected()
        {
            let local = local_node
                .endpoint()
                .and_then(|endpoint| state.pool.get(&endpoint.uri).cloned());
            if let Some(mut local) = local {
                local.liveness = self.probe_liveness(&local).await;
                state.record_liveness(&local.uri, local.liveness.clone());
                tracing::info!(uri = %local.uri, "Preferring local node");
                state.active = Some(local);
            }
        }

        if self.settings.mode == ClientMode::Desktop && configured.is_none() {
            state.policy.auto_switch = true;
            let candidates = state.pool.list();
            state.active = self.selector.best_available(&candidates).await;
        }

        // A persisted fixed period applies to the first poller. A disabled one
        // does not carry over across restarts.
        let period = match state.policy.refresh_period {
            RefreshPeriod::Fixed(period) => RefreshPeriod::Fixed(period),
            RefreshPeriod::Adaptive | RefreshPeriod::Disabled => RefreshPeriod::Adaptive,
        };
        let active = state.active.clone();
        self.transition_at(state, active, period).await
    }

    async fn probe_liveness(&self, endpoint: &EndpointDescriptor) -> Liveness {
        let result = self.selector.probe(endpoint).await;
        telemetry::record_endpoint_reachable(&endpoint.uri, result.is_ok());
        match result {
            Ok(latency) => Liveness::reachable(latency),
            Err(e) => Liveness::unreachable(e.to_string()),
        }
    }

    /// Apply a new active connection: persist it, rebind the daemon handle,
    /// restart polling at the adaptive period and notify subscribers.
    async fn transition(
        self: &Arc<Self>,
        state: &mut State,
        target: ConnectionChange,
    ) -> ConnectionResult<()> {
        self.transition_at(state, target, RefreshPeriod::Adaptive).await
    }

    async fn transition_at(
        self: &Arc<Self>,
        state: &mut State,
        target: ConnectionChange,
        refresh_period: RefreshPeriod,
    ) -> ConnectionResult<()> {
        let store = &self.collaborators.store;
        match &target {
            None => {
                store.set_current_uri(None)?;
                state.daemon = None;
            }
            Some(endpoint) => {
                state.pool.upsert(endpoint.clone())?;
                store.set_current_uri(Some(&endpoint.uri))?;
                state.daemon = Some(DaemonHandle::new(
                    endpoint.clone(),
                    self.collaborators.transport.clone(),
                ));
            }
        }
        state.active = target.clone();
        self.active_uri
            .store(target.as_ref().map(|endpoint| Arc::new(endpoint.uri.clone())));
        self.status.reset();
        self.consecutive_failures.store(0, Ordering::SeqCst);

        match &target {
            Some(endpoint) => tracing::info!(
                uri = %endpoint.uri,
                priority = endpoint.priority,
                local = endpoint.is_local(),
                "Active connection changed"
            ),
            None => tracing::info!("Active connection cleared"),
        }

        self.restart_poller(state, refresh_period).await;
        telemetry::record_connection_change();
        let _ = self.changes.send(target);
        Ok(())
    }

    /// Stop the current poller and start a new one against the active daemon.
    async fn restart_poller(self: &Arc<Self>, state: &mut State, refresh_period: RefreshPeriod) {
        if let Some(poller) = state.poller.take() {
            poller.stop();
        }

        let tick = self.tick_fn(state.daemon.clone());
        let inner = self.clone();
        let active = state.active.clone();
        let period = move || {
            let snapshot = inner.status.snapshot();
            resolve_period(
                refresh_period,
                active.as_ref(),
                snapshot.as_deref(),
                &inner.settings.cadence,
            )
        };

        state.poller = Some(HealthPoller::start(tick, period).await);
    }

    fn tick_fn(self: &Arc<Self>, daemon: Option<DaemonHandle>) -> TickFn {
        let weak = Arc::downgrade(self);
        Arc::new(move |tick| {
            let weak = weak.clone();
            let daemon = daemon.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                match daemon {
                    Some(daemon) => inner.poll_daemon(&daemon, tick).await,
                    // Scheduled ticks keep looking for a connection; the
                    // immediate one runs under the lock.
                    None if tick == Tick::Scheduled => inner.fail_over(None).await,
                    None => {}
                }
            }
            .boxed()
        })
    }

    fn is_active(&self, uri: &str) -> bool {
        self.active_uri
            .load()
            .as_deref()
            .is_some_and(|active| active.as_str() == uri)
    }

    /// One health poll. Failures are absorbed here and never reach callers.
    async fn poll_daemon(self: &Arc<Self>, daemon: &DaemonHandle, tick: Tick) {
        match daemon.get_info().await {
            Ok(info) => {
                let peers = match daemon.get_online_peers().await {
                    Ok(peers) => peers,
                    Err(e) => {
                        tracing::debug!(uri = %daemon.uri(), error = %e, "Peer list unavailable");
                        Vec::new()
                    }
                };
                if !self.is_active(daemon.uri()) {
                    tracing::debug!(uri = %daemon.uri(), "Connection changed during poll, discarding");
                    return;
                }
                self.status.apply_snapshot(DaemonSnapshot::new(info, peers));
                self.consecutive_failures.store(0, Ordering::SeqCst);
                telemetry::record_endpoint_reachable(daemon.uri(), true);

                let recovered = self.error_log().recover();
                if recovered {
                    tracing::info!(uri = %daemon.uri(), "Fetched daemon info after previous error");
                }
            }
            Err(e) => {
                if !self.is_active(daemon.uri()) {
                    return;
                }
                telemetry::record_poll_failure();
                telemetry::record_endpoint_reachable(daemon.uri(), false);
                self.status.clear_peers();

                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                let should_log = self.error_log().should_log(Instant::now());
                if should_log {
                    tracing::warn!(uri = %daemon.uri(), error = %e, failures, "Could not update daemon info");
                }

                if failures >= self.settings.failures_before_switch {
                    let failed = Some(daemon.uri().to_string());
                    match tick {
                        Tick::Scheduled => self.fail_over(failed).await,
                        // The immediate tick runs under the orchestrator lock.
                        Tick::Immediate => {
                            tokio::spawn(self.fail_over(failed));
                        }
                    }
                }
            }
        }
    }

    /// Boxed to break the cycle transition → poller → tick → fail_over.
    fn fail_over(self: &Arc<Self>, failed_uri: Option<String>) -> BoxFuture<'static, ()> {
        let inner = self.clone();
        async move {
            let candidates = {
                let state = inner.state.lock().await;
                if !state.policy.auto_switch || state.active_uri() != failed_uri.as_deref() {
                    return;
                }
                state.pool.list()
            };

            let best = inner.selector.best_available(&candidates).await;

            let mut state = inner.state.lock().await;
            if state.active_uri() != failed_uri.as_deref() {
                tracing::debug!(failed = ?failed_uri, "Connection changed during failover, skipping");
                return;
            }
            if best.is_none() && state.active.is_none() {
                return;
            }

            tracing::warn!(
                from = ?failed_uri,
                to = ?best.as_ref().map(|b| b.uri.as_str()),
                "Switching to best available connection"
            );
            telemetry::record_failover();
            if let Err(e) = inner.transition(&mut state, best).await {
                tracing::error!(error = %e, "Failover failed");
            }
        }
        .boxed()
    }
}

fn validate_uri(endpoint: &EndpointDescriptor) -> ConnectionResult<()> {
    endpoint
        .parse_uri()
        .map(|_| ())
        .map_err(|e| ConnectionError::InvalidEndpoint {
            uri: endpoint.uri.clone(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_node::UnmanagedLocalNode;
    use crate::orchestrator::account::{AccountState, AlwaysOpen};
    use crate::store::MemoryStore;
    use crate::transport::{DaemonInfo, PeerInfo, TransportError};
    use async_trait::async_trait;

    /// Every endpoint answers probes; `get_info` reports a fixed height.
    struct StaticTransport {
        height: u64,
        target_height: u64,
    }

    #[async_trait]
    impl DaemonTransport for StaticTransport {
        async fn probe(
            &self,
            _endpoint: &EndpointDescriptor,
            _timeout: Duration,
        ) -> TransportResult<Duration> {
            Ok(Duration::from_millis(1))
        }

        async fn fetch_daemon_info(
            &self,
            _endpoint: &EndpointDescriptor,
        ) -> TransportResult<DaemonInfo> {
            Ok(DaemonInfo {
                height: self.height,
                target_height: self.target_height,
                ..Default::default()
            })
        }

        async fn fetch_peers(&self, endpoint: &EndpointDescriptor) -> TransportResult<Vec<PeerInfo>> {
            Err(TransportError::Rpc {
                uri: endpoint.uri.clone(),
                message: "restricted".into(),
            })
        }
    }

    fn orchestrator(
        account: Arc<dyn AccountGate>,
        height: u64,
        target_height: u64,
    ) -> (ConnectionOrchestrator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut settings = OrchestratorSettings::for_network(Network::Stagenet);
        settings.mode = ClientMode::Api;
        let collaborators = Collaborators {
            store: store.clone(),
            transport: Arc::new(StaticTransport {
                height,
                target_height,
            }),
            account,
            local_node: Arc::new(UnmanagedLocalNode::new()),
        };
        (ConnectionOrchestrator::new(settings, collaborators), store)
    }

    #[tokio::test]
    async fn test_closed_account_rejects_operations() {
        let account = Arc::new(AccountState::new(false));
        let (orchestrator, store) = orchestrator(account.clone(), 100, 100);

        let err = orchestrator
            .add_connection(EndpointDescriptor::new("http://node.example.org:38081"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::AccountNotOpen));
        assert!(matches!(
            orchestrator.get_connections().await,
            Err(ConnectionError::AccountNotOpen)
        ));
        assert!(store.snapshot().unwrap().connections.is_empty());

        account.open();
        orchestrator.initialize().await.unwrap();
        assert!(!orchestrator.get_connections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_observation_available_while_account_closed() {
        let account = Arc::new(AccountState::new(false));
        let (orchestrator, _) = orchestrator(account.clone(), 100, 100);

        let mut changes = orchestrator.subscribe();
        assert!(orchestrator.status().snapshot().is_none());
        assert!(matches!(
            orchestrator.last_info().await,
            Err(ConnectionError::AccountNotOpen)
        ));

        account.open();
        orchestrator.initialize().await.unwrap();
        orchestrator.set_connection_uri("http://127.0.0.1:38081").await.unwrap();
        assert_eq!(changes.recv().await.unwrap(), None);
        assert_eq!(
            changes.recv().await.unwrap().unwrap().uri,
            "http://127.0.0.1:38081"
        );
        assert_eq!(orchestrator.status().chain_height(), 100);
        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_uri_rejected() {
        let (orchestrator, _) = orchestrator(Arc::new(AlwaysOpen), 100, 100);
        let err = orchestrator
            .add_connection(EndpointDescriptor::new("127.0.0.1 38081"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn test_set_connection_refreshes_snapshot() {
        let (orchestrator, store) = orchestrator(Arc::new(AlwaysOpen), 50, 100);
        orchestrator.initialize().await.unwrap();

        let local = EndpointDescriptor::new("http://127.0.0.1:38081").with_priority(1);
        orchestrator.set_connection(local).await.unwrap();

        let snapshot = orchestrator.last_info().await.unwrap().unwrap();
        assert_eq!(snapshot.height, 50);
        assert!(snapshot.peers.is_empty());
        assert_eq!(orchestrator.status().chain_height(), 100);
        assert!(orchestrator.is_connection_local().await.unwrap());
        assert_eq!(orchestrator.default_refresh_period_ms().await.unwrap(), 20_000);
        assert_eq!(
            store.snapshot().unwrap().current_uri.as_deref(),
            Some("http://127.0.0.1:38081")
        );
        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_set_unknown_uri() {
        let (orchestrator, _) = orchestrator(Arc::new(AlwaysOpen), 100, 100);
        orchestrator.initialize().await.unwrap();
        let err = orchestrator
            .set_connection_uri("http://missing.example.org:38081")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::UnknownEndpoint(_)));
    }

    #[tokio::test]
    async fn test_sync_tolerance_requires_connection() {
        let (orchestrator, _) = orchestrator(Arc::new(AlwaysOpen), 100, 104);
        orchestrator.initialize().await.unwrap();
        assert!(!orchestrator.is_synced_within_tolerance().await.unwrap());
        assert!(matches!(
            orchestrator.verify_connection().await,
            Err(ConnectionError::NoConnection)
        ));

        orchestrator.set_connection_uri("http://127.0.0.1:38081").await.unwrap();
        assert!(!orchestrator.is_synced_within_tolerance().await.unwrap());
        assert!(matches!(
            orchestrator.verify_connection().await,
            Err(ConnectionError::NotSynced {
                height: 100,
                target_height: 104
            })
        ));
        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_checking_persists_disabled() {
        let (orchestrator, store) = orchestrator(Arc::new(AlwaysOpen), 100, 100);
        orchestrator.initialize().await.unwrap();

        orchestrator.start_checking_connection(Some(2_000)).await.unwrap();
        assert_eq!(store.snapshot().unwrap().refresh_period_ms, 2_000);
        assert_eq!(
            orchestrator.get_refresh_period().await.unwrap(),
            RefreshPeriod::Fixed(Duration::from_millis(2_000))
        );

        orchestrator.stop_checking_connection().await.unwrap();
        assert_eq!(store.snapshot().unwrap().refresh_period_ms, -1);
        assert_eq!(
            orchestrator.get_refresh_period().await.unwrap(),
            RefreshPeriod::Disabled
        );
    }

    #[tokio::test]
    async fn test_poll_of_replaced_connection_is_discarded() {
        let (orchestrator, _) = orchestrator(Arc::new(AlwaysOpen), 100, 100);
        orchestrator.initialize().await.unwrap();
        orchestrator.set_connection_uri("http://127.0.0.1:38081").await.unwrap();
        orchestrator.inner.status.reset();

        let previous = DaemonHandle::new(
            EndpointDescriptor::new("http://node.example.org:38081"),
            orchestrator.inner.collaborators.transport.clone(),
        );
        orchestrator.inner.poll_daemon(&previous, Tick::Scheduled).await;
        assert!(orchestrator.status().snapshot().is_none());

        let current = orchestrator.daemon().await.unwrap().unwrap();
        orchestrator.inner.poll_daemon(&current, Tick::Scheduled).await;
        assert_eq!(orchestrator.status().snapshot().unwrap().height, 100);
        orchestrator.shutdown().await;
    }
}
