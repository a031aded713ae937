//! Daemon connection manager.
//!
//! Keeps one active daemon connection out of a pool of candidates, polls its
//! health and fails over to the best available candidate.
//!
//! ```text
//! config (TOML) ──▶ ConnectionOrchestrator ──▶ HealthPoller ──▶ JSON-RPC transport
//!                     │        ▲                   │
//!                     ▼        │                   ▼
//!               store (JSON)   local node     ConnectionStatus
//!                              events         (observations)
//! ```

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use daemon_connections::config::{load_config, DaemonConfig};
use daemon_connections::endpoint::{default_endpoints, EndpointDescriptor};
use daemon_connections::lifecycle::{signals::wait_for_signal, Shutdown};
use daemon_connections::local_node::UnmanagedLocalNode;
use daemon_connections::observability::{init_logging, init_metrics};
use daemon_connections::orchestrator::{
    AlwaysOpen, Collaborators, ConnectionOrchestrator, OrchestratorSettings,
};
use daemon_connections::store::{ConnectionStore, JsonFileStore, MemoryStore};
use daemon_connections::transport::JsonRpcTransport;

const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "daemon-connections")]
#[command(about = "Daemon connection manager with health polling and failover", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect, poll the active daemon and fail over until interrupted
    Run,
    /// Probe every candidate and print the results
    Check,
    /// Connect once, poll the active daemon and print its status
    Status,
    /// Print the best available candidate
    Best,
    /// Print the built-in candidates for the configured network
    Defaults,
}

/// Probe outcome as printed by `check` and `best`.
#[derive(Serialize)]
struct ProbeReport {
    uri: String,
    priority: u32,
    local: bool,
    reachable: bool,
    latency_ms: Option<u64>,
    error: Option<String>,
}

impl From<&EndpointDescriptor> for ProbeReport {
    fn from(endpoint: &EndpointDescriptor) -> Self {
        Self {
            uri: endpoint.uri.clone(),
            priority: endpoint.priority,
            local: endpoint.is_local(),
            reachable: endpoint.is_reachable(),
            latency_ms: endpoint.liveness.latency.map(|l| l.as_millis() as u64),
            error: endpoint.liveness.last_error.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DaemonConfig::default(),
    };
    init_logging(&config.observability.log_level)?;

    tracing::info!(
        network = %config.network,
        mode = ?config.mode,
        storage = ?config.storage.path,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Run => run(&config).await?,
        Commands::Check => {
            let orchestrator = build_orchestrator(&config)?;
            orchestrator.initialize().await?;
            let probed = orchestrator.check_connections().await?;
            let reports: Vec<ProbeReport> = probed.iter().map(ProbeReport::from).collect();
            print_json(&reports)?;
            orchestrator.shutdown().await;
        }
        Commands::Status => {
            let orchestrator = build_orchestrator(&config)?;
            orchestrator.initialize().await?;
            let active = orchestrator.get_connection().await?;
            if active.is_some() {
                if let Err(e) = orchestrator.check_connection().await {
                    tracing::warn!(error = %e, "Active daemon did not answer");
                }
            }
            print_json(&orchestrator.status().report(active))?;
            orchestrator.shutdown().await;
        }
        Commands::Best => {
            let orchestrator = build_orchestrator(&config)?;
            orchestrator.initialize().await?;
            let best = orchestrator.get_best_available_connection().await?;
            print_json(&best.as_ref().map(ProbeReport::from))?;
            orchestrator.shutdown().await;
        }
        Commands::Defaults => print_json(&default_endpoints(config.network))?,
    }

    Ok(())
}

async fn run(config: &DaemonConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let orchestrator = build_orchestrator(config)?;
    let mut changes = orchestrator.subscribe();
    orchestrator.initialize().await?;

    match orchestrator.get_connection().await? {
        Some(active) => tracing::info!(uri = %active.uri, "Connected"),
        None => tracing::warn!("No daemon connection available"),
    }

    let shutdown = Arc::new(Shutdown::new());
    let mut stop = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    let mut status_ticker = tokio::time::interval(STATUS_LOG_INTERVAL);
    loop {
        tokio::select! {
            _ = stop.recv() => break,
            change = changes.recv() => match change {
                Ok(Some(endpoint)) => tracing::info!(uri = %endpoint.uri, "Connection changed"),
                Ok(None) => tracing::warn!("Connection lost, no candidate reachable"),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "Missed connection changes"),
                Err(RecvError::Closed) => break,
            },
            _ = status_ticker.tick() => {
                let status = orchestrator.status();
                tracing::info!(
                    chain_height = status.chain_height(),
                    peers = status.num_peers(),
                    download = status.download_percentage(),
                    sufficient_peers = status.has_sufficient_peers_for_broadcast(),
                    "Daemon status"
                );
            }
        }
    }

    orchestrator.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_orchestrator(
    config: &DaemonConfig,
) -> Result<ConnectionOrchestrator, Box<dyn std::error::Error>> {
    let store: Arc<dyn ConnectionStore> = match &config.storage.path {
        Some(path) => Arc::new(JsonFileStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    let settings = OrchestratorSettings::from_config(config);
    let transport = JsonRpcTransport::new(settings.probe_timeout)?;

    let collaborators = Collaborators {
        store,
        transport: Arc::new(transport),
        account: Arc::new(AlwaysOpen),
        local_node: Arc::new(UnmanagedLocalNode::new()),
    };
    Ok(ConnectionOrchestrator::new(settings, collaborators))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
