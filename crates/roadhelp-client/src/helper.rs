//! The helper workflow: hear about requests and take one.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use roadhelp_core::events::AcceptHelp;
use roadhelp_core::model::{Acceptance, Identity};
use roadhelp_core::result::AppResult;
use roadhelp_core::types::id::{HelpRequestId, UserId};

use crate::api::{AcceptHelpBody, DispatchApi};
use crate::channel::{HelpRequested, RealtimeChannel, Subscription};
use crate::position::PositionSource;

/// What the helper's UI is told.
#[derive(Debug, Clone, PartialEq)]
pub enum DeskEvent {
    /// Someone needs help.
    Requested(HelpRequested),
    /// A request was taken, by this helper or another.
    Taken {
        /// The request.
        request_id: HelpRequestId,
        /// Who took it.
        helper_id: UserId,
    },
}

/// Helper-side dispatch workflow for one session.
#[derive(Debug)]
pub struct HelperDesk {
    identity: Identity,
    api: Arc<dyn DispatchApi>,
    channel: RealtimeChannel,
    position: Arc<dyn PositionSource>,
    _requested: Subscription,
    _accepted: Subscription,
}

impl HelperDesk {
    /// Subscribes to announcements and acceptances.
    pub fn new(
        identity: Identity,
        api: Arc<dyn DispatchApi>,
        channel: RealtimeChannel,
        position: Arc<dyn PositionSource>,
    ) -> (Self, mpsc::UnboundedReceiver<DeskEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();

        let requested_tx = events.clone();
        let own_id = identity.id.clone();
        let requested = channel.on_help_requested(move |request| {
            if request.requester_id != own_id {
                let _ = requested_tx.send(DeskEvent::Requested(request.clone()));
            }
        });

        let accepted = channel.on_help_accepted(move |accepted| {
            let _ = events.send(DeskEvent::Taken {
                request_id: accepted.acceptance.request_id.clone(),
                helper_id: accepted.acceptance.helper_id.clone(),
            });
        });

        let desk = Self {
            identity,
            api,
            channel,
            position,
            _requested: requested,
            _accepted: accepted,
        };
        (desk, events_rx)
    }

    /// Accepts a request: update the record, then tell the dispatcher.
    pub async fn accept(
        &self,
        request_id: &HelpRequestId,
        requester_id: Option<UserId>,
        issue: Option<String>,
    ) -> AppResult<Acceptance> {
        let location = self.position.current_position().await?;

        let body = AcceptHelpBody {
            helper_id: self.identity.id.clone(),
            helper_name: self.identity.display_name.clone(),
            location,
        };
        let acceptance = self
            .api
            .accept_help_request(request_id, &body)
            .await?;

        let claim = AcceptHelp {
            acceptance: acceptance.clone(),
            requester_id,
            requester_name: None,
            issue,
        };
        if let Err(e) = self.channel.emit_acceptance(claim).await {
            warn!(request_id = %request_id, error = %e, "Failed to announce acceptance");
        }

        info!(
            request_id = %request_id,
            helper_id = %self.identity.id,
            "Help request accepted"
        );
        Ok(acceptance)
    }

    /// Who this desk belongs to.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}
