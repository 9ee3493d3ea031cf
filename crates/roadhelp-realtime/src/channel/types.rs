//! Channel type definitions.

use serde::{Deserialize, Serialize};

use roadhelp_core::types::id::{HelpRequestId, UserId};

/// Typed channel identifiers.
///
/// Broadcast to every connection goes through the pool directly and has no
/// channel of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum ChannelType {
    /// Personal channel: every connection of one user.
    User(UserId),
    /// Room for one help request: its requester plus whoever accepted it.
    Request(HelpRequestId),
}

impl ChannelType {
    /// Converts to a channel string.
    pub fn to_channel_string(&self) -> String {
        match self {
            Self::User(id) => format!("user:{id}"),
            Self::Request(id) => format!("request:{id}"),
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_channel_string())
    }
}
