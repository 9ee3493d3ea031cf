//! Channel registry: which connections listen on which channels.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::connection::handle::ConnectionId;

use super::types::ChannelType;

/// Registry of active channels with a reverse index per connection.
///
/// Broadcast is implicit (the whole pool) and never stored here.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    /// Channel name → subscribed connections.
    channels: DashMap<String, HashSet<ConnectionId>>,
    /// Connection → channel names it is subscribed to.
    by_connection: DashMap<ConnectionId, HashSet<String>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a connection to a channel. Returns `false` if it already was.
    pub fn subscribe(&self, channel: &ChannelType, conn_id: ConnectionId) -> bool {
        let name = channel.to_channel_string();
        let added = self
            .channels
            .entry(name.clone())
            .or_default()
            .insert(conn_id);
        self.by_connection.entry(conn_id).or_default().insert(name);
        added
    }

    /// Unsubscribes a connection from a channel, dropping the channel when empty.
    pub fn unsubscribe(&self, channel: &ChannelType, conn_id: ConnectionId) {
        let name = channel.to_channel_string();
        self.detach(&name, conn_id);
        if let Some(mut names) = self.by_connection.get_mut(&conn_id) {
            names.remove(&name);
        }
    }

    /// Unsubscribes a connection from every channel it joined.
    pub fn unsubscribe_all(&self, conn_id: ConnectionId) {
        let names = self
            .by_connection
            .remove(&conn_id)
            .map(|(_, names)| names)
            .unwrap_or_default();
        for name in &names {
            self.detach(name, conn_id);
        }
    }

    /// Returns the subscribers of a channel.
    pub fn subscribers(&self, channel: &ChannelType) -> Vec<ConnectionId> {
        self.channels
            .get(&channel.to_channel_string())
            .map(|entry| entry.value().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of channels a connection is subscribed to.
    pub fn subscription_count(&self, conn_id: ConnectionId) -> usize {
        self.by_connection
            .get(&conn_id)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Number of non-empty channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn detach(&self, name: &str, conn_id: ConnectionId) {
        let now_empty = match self.channels.get_mut(name) {
            Some(mut members) => {
                members.remove(&conn_id);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.channels.remove_if(name, |_, members| members.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadhelp_core::types::id::{HelpRequestId, UserId};
    use uuid::Uuid;

    #[test]
    fn test_subscribe_and_list() {
        let registry = ChannelRegistry::new();
        let conn = Uuid::new_v4();
        let room = ChannelType::Request(HelpRequestId::new("r1"));

        assert!(registry.subscribe(&room, conn));
        assert!(!registry.subscribe(&room, conn));
        assert_eq!(registry.subscribers(&room), vec![conn]);
        assert_eq!(registry.subscription_count(conn), 1);
    }

    #[test]
    fn test_unsubscribe_all_drops_empty_channels() {
        let registry = ChannelRegistry::new();
        let conn = Uuid::new_v4();
        let other = Uuid::new_v4();
        let user = ChannelType::User(UserId::new("u1"));
        let room = ChannelType::Request(HelpRequestId::new("r1"));

        registry.subscribe(&user, conn);
        registry.subscribe(&room, conn);
        registry.subscribe(&room, other);
        registry.unsubscribe_all(conn);

        assert!(registry.subscribers(&user).is_empty());
        assert_eq!(registry.subscribers(&room), vec![other]);
        assert_eq!(registry.channel_count(), 1);
        assert_eq!(registry.subscription_count(conn), 0);
    }

    #[test]
    fn test_unsubscribe_single() {
        let registry = ChannelRegistry::new();
        let conn = Uuid::new_v4();
        let room = ChannelType::Request(HelpRequestId::new("r2"));

        registry.subscribe(&room, conn);
        registry.unsubscribe(&room, conn);
        assert_eq!(registry.channel_count(), 0);
        assert_eq!(registry.subscription_count(conn), 0);
    }
}
