//! The client's realtime channel to the dispatcher.

pub mod handlers;
pub mod transport;

use std::sync::Arc;

use tracing::debug;

use roadhelp_core::config::RealtimeConfig;
use roadhelp_core::events::{
    AcceptHelp, ClientEvent, HELP_ACCEPTED, HELP_REQUESTED, HelpAccepted, ServerEvent,
};
use roadhelp_core::result::AppResult;
use roadhelp_core::types::id::{HelpRequestId, UserId};

pub use handlers::{HandlerRegistry, Subscription};
pub use transport::{ChannelTransport, WsTransport};

/// A `help-requested` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpRequested {
    /// Request to look up in the record store.
    pub help_request_id: HelpRequestId,
    /// Who asked.
    pub requester_id: UserId,
}

/// One long-lived, bidirectional channel per session.
#[derive(Debug, Clone)]
pub struct RealtimeChannel {
    transport: Arc<dyn ChannelTransport>,
    handlers: Arc<HandlerRegistry>,
}

impl RealtimeChannel {
    /// Wraps an existing transport. Inbound events are fed through [`Self::deliver`].
    pub fn new(transport: Arc<dyn ChannelTransport>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            transport,
            handlers,
        }
    }

    /// Connects to the dispatcher over WebSocket.
    pub async fn connect(config: &RealtimeConfig, token: &str) -> AppResult<Self> {
        let handlers = HandlerRegistry::new();
        let transport = WsTransport::connect(config, token, handlers.clone()).await?;
        Ok(Self::new(Arc::new(transport), handlers))
    }

    /// Tells the dispatcher a help request record now exists.
    pub async fn emit_help_request(&self, help_request_id: &HelpRequestId) -> AppResult<()> {
        debug!(request_id = %help_request_id, "Emitting send-help-request");
        self.transport
            .send(&ClientEvent::SendHelpRequest {
                help_request_id: help_request_id.clone(),
            })
            .await
    }

    /// Tells the dispatcher a helper took a request.
    pub async fn emit_acceptance(&self, claim: AcceptHelp) -> AppResult<()> {
        debug!(request_id = %claim.acceptance.request_id, "Emitting accept-help");
        self.transport.send(&ClientEvent::AcceptHelp(claim)).await
    }

    /// Calls `handler` for every `help-accepted` event until the subscription drops.
    pub fn on_help_accepted<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&HelpAccepted) + Send + Sync + 'static,
    {
        self.handlers.register(
            HELP_ACCEPTED,
            Arc::new(move |event: &ServerEvent| {
                if let ServerEvent::HelpAccepted(accepted) = event {
                    handler(accepted);
                }
            }),
        )
    }

    /// Calls `handler` for every `help-requested` event until the subscription drops.
    pub fn on_help_requested<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&HelpRequested) + Send + Sync + 'static,
    {
        self.handlers.register(
            HELP_REQUESTED,
            Arc::new(move |event: &ServerEvent| {
                if let ServerEvent::HelpRequested {
                    help_request_id,
                    requester_id,
                } = event
                {
                    handler(&HelpRequested {
                        help_request_id: help_request_id.clone(),
                        requester_id: requester_id.clone(),
                    });
                }
            }),
        )
    }

    /// Hands an inbound event to the registered handlers.
    pub fn deliver(&self, event: &ServerEvent) -> usize {
        self.handlers.dispatch(event)
    }

    /// The handler registry behind this channel.
    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }
}
