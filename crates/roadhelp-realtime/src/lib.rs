//! # roadhelp-realtime
//!
//! Realtime dispatcher for RoadHelp. Provides:
//!
//! - WebSocket connection management with token-derived identity
//! - Channel registry (per-user, per-request, broadcast)
//! - The dispatch coordinator (at most one acceptance per request)
//! - Heartbeat keepalive and engine metrics
//! - The axum route that hosts it all

pub mod channel;
pub mod connection;
pub mod coordinator;
pub mod http;
pub mod message;
pub mod metrics;
pub mod server;

pub use channel::registry::ChannelRegistry;
pub use connection::manager::ConnectionManager;
pub use coordinator::DispatchCoordinator;
pub use server::RealtimeEngine;
