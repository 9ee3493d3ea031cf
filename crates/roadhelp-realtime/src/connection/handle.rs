//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, RwLock, mpsc};
use uuid::Uuid;

use roadhelp_core::model::Identity;
use roadhelp_core::types::id::UserId;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A handle to a single WebSocket connection.
///
/// Holds the sender for pushing serialized frames to the client,
/// plus the identity the connection authenticated as.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Who is connected
    pub identity: Identity,
    /// Sender for outbound frames
    sender: mpsc::Sender<String>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last inbound frame
    last_activity: RwLock<DateTime<Utc>>,
    /// Last pong received
    last_pong: RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Wakes the socket task once the connection is marked dead
    closed: Notify,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(identity: Identity, sender: mpsc::Sender<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            identity,
            sender,
            connected_at: now,
            last_activity: RwLock::new(now),
            last_pong: RwLock::new(now),
            alive: AtomicBool::new(true),
            closed: Notify::new(),
        }
    }

    /// The connected user's ID
    pub fn user_id(&self) -> &UserId {
        &self.identity.id
    }

    /// Queue a frame for this connection. Never waits.
    pub fn send(&self, frame: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            self.closed.notify_one();
        }
    }

    /// Resolves once the connection is marked dead.
    pub async fn closed(&self) {
        if !self.is_alive() {
            return;
        }
        self.closed.notified().await;
    }

    /// Update last activity timestamp
    pub async fn touch(&self) {
        *self.last_activity.write().await = Utc::now();
    }

    /// Record a pong response
    pub async fn record_pong(&self) {
        let now = Utc::now();
        *self.last_pong.write().await = now;
        *self.last_activity.write().await = now;
    }

    /// When the last pong arrived
    pub async fn last_pong(&self) -> DateTime<Utc> {
        *self.last_pong.read().await
    }

    /// Get a snapshot of connection info
    pub async fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            user_id: self.identity.id.clone(),
            display_name: self.identity.display_name.clone(),
            connected_at: self.connected_at,
            last_activity: *self.last_activity.read().await,
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// User ID
    pub user_id: UserId,
    /// Display name
    pub display_name: String,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Last activity
    pub last_activity: DateTime<Utc>,
    /// Is alive
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_after_receiver_dropped_marks_dead() {
        let (tx, rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Identity::new("u1", "Ana"), tx);
        drop(rx);

        assert!(!handle.send("frame".to_string()));
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_closed_resolves_after_mark_dead() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = std::sync::Arc::new(ConnectionHandle::new(Identity::new("u1", "Ana"), tx));

        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.closed().await }
        });
        tokio::task::yield_now().await;
        handle.mark_dead();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("closed resolved")
            .expect("join");
        tokio::time::timeout(std::time::Duration::from_secs(1), handle.closed())
            .await
            .expect("already closed");
    }

    #[tokio::test]
    async fn test_full_buffer_drops_but_stays_alive() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Identity::new("u1", "Ana"), tx);

        assert!(handle.send("first".to_string()));
        assert!(!handle.send("second".to_string()));
        assert!(handle.is_alive());
        assert_eq!(rx.recv().await.as_deref(), Some("first"));
    }
}
