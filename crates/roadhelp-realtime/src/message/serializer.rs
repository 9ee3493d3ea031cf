//! JSON serialization for realtime frames.

use roadhelp_core::events::{ClientEvent, ServerEvent};

/// Serialize a dispatcher event to a text frame
pub fn encode_server_event(event: &ServerEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Deserialize a client event from a text frame
pub fn decode_client_event(text: &str) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_str(text)
}
