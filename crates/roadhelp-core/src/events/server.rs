//! Dispatcher → client events.

use serde::{Deserialize, Serialize};

use crate::model::Acceptance;
use crate::types::id::{HelpRequestId, UserId};

use super::client::AcceptHelp;

/// Events the dispatcher pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A new help request was announced.
    #[serde(rename_all = "camelCase")]
    HelpRequested {
        /// ID of the durable record; helpers fetch details from the record store.
        help_request_id: HelpRequestId,
        /// Who asked.
        requester_id: UserId,
    },
    /// A help request was accepted. Not scoped to the requester: every
    /// receiving client must check the request ID against its own state.
    HelpAccepted(HelpAccepted),
    /// Keepalive.
    Ping {
        /// Dispatcher timestamp (unix millis).
        timestamp: i64,
    },
    /// Something the client sent was rejected.
    Error {
        /// Machine-readable code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}

impl ServerEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HelpRequested { .. } => super::HELP_REQUESTED,
            Self::HelpAccepted(_) => super::HELP_ACCEPTED,
            Self::Ping { .. } => "ping",
            Self::Error { .. } => "error",
        }
    }

    /// Builds an error event.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Payload of a `help-accepted` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpAccepted {
    /// The acceptance.
    #[serde(flatten)]
    pub acceptance: Acceptance,
    /// Requester of the accepted request.
    pub requester_id: UserId,
    /// Requester's display name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_name: Option<String>,
    /// Issue text, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
}

impl HelpAccepted {
    /// Builds the publication for an accepted claim. `requester_id` is the
    /// dispatcher's record of who announced the request, which wins over
    /// whatever the helper supplied.
    pub fn from_claim(claim: AcceptHelp, requester_id: UserId) -> Self {
        Self {
            acceptance: claim.acceptance,
            requester_id,
            requester_name: claim.requester_name,
            issue: claim.issue,
        }
    }
}
