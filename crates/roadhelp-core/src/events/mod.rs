//! Realtime channel events exchanged between clients and the dispatcher.
//!
//! Frames are JSON objects of the form `{"event": <name>, "data": <payload>}`.
//! [`ClientEvent`] flows client → dispatcher, [`ServerEvent`] flows
//! dispatcher → client. Both sides of the wire share these types.

pub mod client;
pub mod server;

pub use client::{AcceptHelp, ClientEvent};
pub use server::{HelpAccepted, ServerEvent};

/// Event name for the requester's "request sent" notification.
pub const SEND_HELP_REQUEST: &str = "send-help-request";
/// Event name for a helper taking a request.
pub const ACCEPT_HELP: &str = "accept-help";
/// Event name for the dispatcher's "new request" fan-out to helpers.
pub const HELP_REQUESTED: &str = "help-requested";
/// Event name for the dispatcher's "request accepted" publication.
pub const HELP_ACCEPTED: &str = "help-accepted";
