//! Connection pool: all live connections indexed by ID and by user.

use std::sync::Arc;

use dashmap::DashMap;

use roadhelp_core::types::id::UserId;

use super::handle::{ConnectionHandle, ConnectionId};

/// Thread-safe pool of all active WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// User ID → connections in the order they were opened.
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → connection handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle.clone());
        self.by_user
            .entry(handle.user_id().clone())
            .or_default()
            .push(handle);
    }

    /// Removes a connection from the pool.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        let now_empty = match self.by_user.get_mut(handle.user_id()) {
            Some(mut connections) => {
                connections.retain(|c| c.id != *conn_id);
                connections.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.by_user
                .remove_if(handle.user_id(), |_, connections| connections.is_empty());
        }
        Some(handle)
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Gets all connections for a user, oldest first.
    pub fn get_user_connections(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadhelp_core::model::Identity;
    use tokio::sync::mpsc;

    fn handle(user: &str) -> Arc<ConnectionHandle> {
        let (tx, _rx) = mpsc::channel(4);
        Arc::new(ConnectionHandle::new(Identity::new(user, user), tx))
    }

    #[test]
    fn test_add_and_remove() {
        let pool = ConnectionPool::new();
        let a = handle("u1");
        let b = handle("u1");
        pool.add(a.clone());
        pool.add(b.clone());

        assert_eq!(pool.connection_count(), 2);
        assert_eq!(pool.user_count(), 1);

        pool.remove(&a.id);
        let remaining = pool.get_user_connections(&UserId::new("u1"));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);

        pool.remove(&b.id);
        assert_eq!(pool.user_count(), 0);
        assert!(pool.remove(&b.id).is_none());
    }
}
