//! Forwards local daemon lifecycle events to the orchestrator.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::endpoint::Liveness;
use crate::local_node::LocalNodeEvent;
use crate::orchestrator::{ConnectionError, ConnectionOrchestrator, WeakOrchestrator};

pub struct LocalNodeBridge;

impl LocalNodeBridge {
    /// Spawn the event loop. It ends when the event channel closes or the
    /// orchestrator is dropped.
    pub fn spawn(
        orchestrator: WeakOrchestrator,
        mut events: broadcast::Receiver<LocalNodeEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Local node events lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(orchestrator) = orchestrator.upgrade() else {
                    break;
                };
                Self::handle(&orchestrator, event).await;
            }
            tracing::debug!("Local node bridge stopped");
        })
    }

    async fn handle(orchestrator: &ConnectionOrchestrator, event: LocalNodeEvent) {
        match event {
            LocalNodeEvent::Started(mut endpoint) => {
                tracing::info!(uri = %endpoint.uri, "Local node started");
                endpoint.liveness = match orchestrator.probe_endpoint(&endpoint).await {
                    Ok(latency) => Liveness::reachable(latency),
                    Err(e) => Liveness::unreachable(e.to_string()),
                };
                if let Err(e) = orchestrator.set_connection(endpoint).await {
                    tracing::warn!(error = %e, "Failed to switch to local node");
                }
            }
            LocalNodeEvent::Stopped => {
                tracing::info!("Local node stopped");
                let current = match orchestrator.get_connection().await {
                    Ok(current) => current.map(|c| c.uri),
                    Err(e) => {
                        tracing::debug!(error = %e, "Ignoring local node stop");
                        return;
                    }
                };
                match orchestrator.check_connection().await {
                    Ok(_) => {}
                    Err(ConnectionError::Transport(e)) => {
                        tracing::info!(error = %e, "Connection lost after local node stopped");
                        orchestrator.fail_over(current).await;
                    }
                    Err(e) => tracing::warn!(error = %e, "Connection check failed"),
                }
            }
        }
    }
}
