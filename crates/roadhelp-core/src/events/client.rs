//! Client → dispatcher events.

use serde::{Deserialize, Serialize};

use crate::model::Acceptance;
use crate::types::id::{HelpRequestId, UserId};

/// Events a client emits on its realtime connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// The requester created a help request record and wants helpers woken up.
    #[serde(rename_all = "camelCase")]
    SendHelpRequest {
        /// ID of the durable record.
        help_request_id: HelpRequestId,
    },
    /// A helper accepted a request (the durable record is already updated).
    AcceptHelp(AcceptHelp),
    /// Reply to a dispatcher ping.
    Pong {
        /// Echoed timestamp.
        timestamp: i64,
    },
}

impl ClientEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendHelpRequest { .. } => super::SEND_HELP_REQUEST,
            Self::AcceptHelp(_) => super::ACCEPT_HELP,
            Self::Pong { .. } => "pong",
        }
    }
}

/// Payload of an `accept-help` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptHelp {
    /// The acceptance being claimed.
    #[serde(flatten)]
    pub acceptance: Acceptance,
    /// Requester of the accepted request, when the helper knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<UserId>,
    /// Requester's name, when the helper knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_name: Option<String>,
    /// Issue text, echoed for display on the requester side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_help_request_wire_shape() {
        let event = ClientEvent::SendHelpRequest {
            help_request_id: HelpRequestId::new("abc"),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "event": "send-help-request", "data": { "helpRequestId": "abc" } })
        );
        assert_eq!(event.name(), "send-help-request");
    }

    #[test]
    fn test_accept_help_parses_flat_payload() {
        let raw = serde_json::json!({
            "event": "accept-help",
            "data": {
                "requestId": "r1",
                "helperId": 5,
                "helperName": "Mo",
                "location": { "latitude": 1.0, "longitude": 2.0 },
                "acceptedAt": "2026-03-01T10:00:00Z",
                "requesterId": "u1"
            }
        });
        let event: ClientEvent = serde_json::from_value(raw).expect("deserialize");
        match event {
            ClientEvent::AcceptHelp(accept) => {
                assert_eq!(accept.acceptance.helper_id.as_str(), "5");
                assert_eq!(accept.requester_id, Some(UserId::new("u1")));
                assert!(accept.issue.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
