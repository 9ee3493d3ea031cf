//! Realtime channel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Realtime (WebSocket) channel configuration, shared by the dispatcher
/// and the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Dispatcher WebSocket URL the client connects to.
    #[serde(default = "default_url")]
    pub url: String,
    /// Outbound queue size per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Seconds without a pong before a connection is dropped.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Maximum concurrent connections per user; the oldest is replaced.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Largest inbound frame accepted, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Deliver `help-accepted` only to the requester instead of everyone.
    #[serde(default)]
    pub scope_acceptances: bool,
}

impl RealtimeConfig {
    /// Ping interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Ping timeout as a [`Duration`].
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_seconds)
    }

    /// Checks sizes and intervals are non-zero.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.channel_buffer_size == 0 {
            return Err(AppError::configuration("realtime.channel_buffer_size must be > 0"));
        }
        if self.ping_interval_seconds == 0 {
            return Err(AppError::configuration("realtime.ping_interval_seconds must be > 0"));
        }
        if self.max_connections_per_user == 0 {
            return Err(AppError::configuration(
                "realtime.max_connections_per_user must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            max_connections_per_user: default_max_connections_per_user(),
            max_message_bytes: default_max_message_bytes(),
            scope_acceptances: false,
        }
    }
}

fn default_url() -> String {
    "ws://localhost:3001/ws".to_string()
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    75
}

fn default_max_connections_per_user() -> usize {
    5
}

fn default_max_message_bytes() -> usize {
    16_384
}
