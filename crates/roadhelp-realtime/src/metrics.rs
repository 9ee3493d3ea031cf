//! Dispatcher metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    frames_received: AtomicU64,
    frames_sent: AtomicU64,
    frames_rejected: AtomicU64,
    requests_announced: AtomicU64,
    acceptances_recorded: AtomicU64,
    acceptances_rejected: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection was registered
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// A connection was unregistered
    pub fn connection_closed(&self) {
        // Saturate at zero; a double close must not wrap around.
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// A frame arrived from a client
    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Frames queued to clients
    pub fn frames_sent(&self, count: u64) {
        self.frames_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// A frame was answered with an error
    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A help request was announced
    pub fn request_announced(&self) {
        self.requests_announced.fetch_add(1, Ordering::Relaxed);
    }

    /// An acceptance won its request
    pub fn acceptance_recorded(&self) {
        self.acceptances_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// An acceptance lost to an earlier one
    pub fn acceptance_rejected(&self) {
        self.acceptances_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            requests_announced: self.requests_announced.load(Ordering::Relaxed),
            acceptances_recorded: self.acceptances_recorded.load(Ordering::Relaxed),
            acceptances_rejected: self.acceptances_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever registered
    pub connections_total: u64,
    /// Connections currently registered
    pub connections_active: u64,
    /// Frames received from clients
    pub frames_received: u64,
    /// Frames queued to clients
    pub frames_sent: u64,
    /// Frames answered with an error
    pub frames_rejected: u64,
    /// Help requests announced
    pub requests_announced: u64,
    /// Acceptances that won their request
    pub acceptances_recorded: u64,
    /// Acceptances that lost to an earlier one
    pub acceptances_rejected: u64,
}
