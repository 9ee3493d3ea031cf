//! Ping/pong heartbeat for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;

use roadhelp_core::events::ServerEvent;

use crate::message::serializer::encode_server_event;

use super::handle::ConnectionHandle;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Timeout before considering connection dead
    pub ping_timeout: Duration,
}

/// Run heartbeat loop for a connection.
///
/// Sends periodic pings and checks for pong responses. Returns once the
/// connection is dead, either because it was closed elsewhere or because
/// no pong arrived within the timeout.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let mut interval = time::interval(config.ping_interval);
    // The first tick fires immediately; skip it so the client gets a full interval.
    interval.tick().await;

    loop {
        interval.tick().await;

        if !handle.is_alive() {
            break;
        }

        let elapsed = Utc::now() - handle.last_pong().await;
        if let Ok(elapsed) = elapsed.to_std() {
            if elapsed > config.ping_timeout {
                tracing::warn!(
                    conn_id = %handle.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Heartbeat timeout, closing connection"
                );
                handle.mark_dead();
                break;
            }
        }

        let ping = ServerEvent::Ping {
            timestamp: Utc::now().timestamp_millis(),
        };
        let Ok(frame) = encode_server_event(&ping) else {
            continue;
        };
        if !handle.send(frame) && !handle.is_alive() {
            tracing::debug!(conn_id = %handle.id, "Ping send failed, connection closed");
            break;
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
