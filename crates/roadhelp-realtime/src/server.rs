//! Top-level realtime engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use roadhelp_core::config::RealtimeConfig;

use crate::channel::registry::ChannelRegistry;
use crate::connection::heartbeat::HeartbeatConfig;
use crate::connection::manager::ConnectionManager;
use crate::coordinator::DispatchCoordinator;
use crate::metrics::RealtimeMetrics;

/// Central realtime engine shared by every WebSocket task.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Channel registry.
    pub channels: Arc<ChannelRegistry>,
    /// Dispatch coordinator.
    pub coordinator: Arc<DispatchCoordinator>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.connections.connection_count())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new realtime engine with all subsystems.
    pub fn new(config: RealtimeConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(RealtimeMetrics::new());
        let channels = Arc::new(ChannelRegistry::new());
        let coordinator = Arc::new(DispatchCoordinator::new());
        let connections = Arc::new(ConnectionManager::new(
            config,
            channels.clone(),
            coordinator.clone(),
            metrics.clone(),
        ));

        info!("Realtime engine initialized");

        Self {
            connections,
            channels,
            coordinator,
            metrics,
            shutdown_tx,
        }
    }

    /// Heartbeat settings derived from the configuration.
    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        let config = self.connections.config();
        HeartbeatConfig {
            ping_interval: config.ping_interval(),
            ping_timeout: config.ping_timeout(),
        }
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signals every connection task to stop and drops all connections.
    pub fn shutdown(&self) {
        info!("Shutting down realtime engine");
        let _ = self.shutdown_tx.send(());
        self.connections.close_all();
        info!("Realtime engine shut down");
    }
}
