//! The requester workflow.
//!
//! A [`HelpDashboard`] owns one session: it fixes the position, narrows the
//! driver roster to nearby candidates, opens a help request, and listens for
//! the acceptance. Lifecycle:
//!
//! ```text
//! Idle --request_help--> Pending --help-accepted--> Matched
//!   ^                       |                          |
//!   +------ dismiss / expire_stale --------------------+
//! ```
//!
//! The `send-help-request` notification goes out only after the record
//! store has confirmed the request. A failed creation leaves the session
//! `Idle` and emits nothing.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use roadhelp_core::config::{AppConfig, DispatchConfig};
use roadhelp_core::error::{AppError, ErrorKind};
use roadhelp_core::events::HelpAccepted;
use roadhelp_core::filter::{RankedCandidate, filter_by_radius, rank_by_distance};
use roadhelp_core::geo::Coordinate;
use roadhelp_core::identity::bootstrap_identity;
use roadhelp_core::model::{HelperCandidate, Identity};
use roadhelp_core::result::AppResult;
use roadhelp_core::types::id::HelpRequestId;

use crate::api::{DispatchApi, HttpDispatchApi, NewHelpRequest};
use crate::channel::{RealtimeChannel, Subscription};
use crate::position::PositionSource;
use crate::rendezvous::RendezvousView;
use crate::session::{AcceptanceOutcome, OpenOutcome, RequestPhase, SessionStore};

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum UserNotice {
    /// The request was created and announced.
    RequestSent {
        /// The new request.
        request_id: HelpRequestId,
    },
    /// The request could not be created; nothing was sent.
    RequestFailed {
        /// Why.
        message: String,
    },
    /// No position fix; requesting help is disabled.
    LocationUnavailable {
        /// Why.
        message: String,
    },
    /// A helper took the request.
    HelpAccepted {
        /// Who is coming.
        helper_name: String,
        /// Distance and route; absent while the position is unknown.
        rendezvous: Option<RendezvousView>,
    },
    /// The request went unanswered for too long and was withdrawn.
    RequestExpired {
        /// The withdrawn request.
        request_id: HelpRequestId,
    },
}

/// Requester-side dispatch workflow for one session.
#[derive(Debug)]
pub struct HelpDashboard {
    store: SessionStore,
    api: Arc<dyn DispatchApi>,
    channel: RealtimeChannel,
    position: Arc<dyn PositionSource>,
    config: DispatchConfig,
    nearby: Mutex<Vec<HelperCandidate>>,
    notices: mpsc::UnboundedSender<UserNotice>,
    _accepted: Subscription,
}

impl HelpDashboard {
    /// Creates the workflow and subscribes to acceptances.
    ///
    /// Returns the receiver the UI drains for [`UserNotice`]s. Dropping the
    /// dashboard deregisters its handler from the channel.
    pub fn new(
        identity: Option<Identity>,
        api: Arc<dyn DispatchApi>,
        channel: RealtimeChannel,
        position: Arc<dyn PositionSource>,
        config: DispatchConfig,
    ) -> (Self, mpsc::UnboundedReceiver<UserNotice>) {
        let store = SessionStore::new(identity);
        let (notices, notices_rx) = mpsc::unbounded_channel();

        let handler_store = store.clone();
        let handler_notices = notices.clone();
        let accepted = channel.on_help_accepted(move |accepted| {
            apply_acceptance(&handler_store, &handler_notices, accepted);
        });

        let dashboard = Self {
            store,
            api,
            channel,
            position,
            config,
            nearby: Mutex::new(Vec::new()),
            notices,
            _accepted: accepted,
        };
        (dashboard, notices_rx)
    }

    /// Wires a dashboard to the record store and dispatcher for the holder of `token`.
    ///
    /// An undecodable token still connects, with the dispatch flow disabled.
    pub async fn connect(
        config: &AppConfig,
        token: &str,
        position: Arc<dyn PositionSource>,
    ) -> AppResult<(Self, mpsc::UnboundedReceiver<UserNotice>)> {
        let identity = bootstrap_identity(Some(token));
        let api = Arc::new(HttpDispatchApi::new(&config.api)?);
        let channel = RealtimeChannel::connect(&config.realtime, token).await?;
        Ok(Self::new(identity, api, channel, position, config.dispatch.clone()))
    }

    /// Session bootstrap: fix the position, then load nearby candidates.
    pub async fn start(&self) {
        if self.refresh_position().await.is_ok() {
            self.refresh_candidates().await;
        }
    }

    /// Takes a fresh position fix.
    pub async fn refresh_position(&self) -> AppResult<Coordinate> {
        match self.position.current_position().await {
            Ok(position) => {
                self.store.set_position(position);
                debug!(position = %position, "Position fixed");
                Ok(position)
            }
            Err(e) => {
                warn!(error = %e, "Position unavailable");
                self.notify(UserNotice::LocationUnavailable {
                    message: e.message.clone(),
                });
                Err(e.into_kind(ErrorKind::PositionUnavailable))
            }
        }
    }

    /// Re-queries the roster and keeps the candidates within the radius.
    ///
    /// A roster failure degrades to an empty set.
    pub async fn refresh_candidates(&self) -> Vec<HelperCandidate> {
        let Some(origin) = self.store.position() else {
            debug!("No position yet; skipping candidate refresh");
            return Vec::new();
        };

        let roster = match self.api.list_drivers().await {
            Ok(roster) => roster,
            Err(e) => {
                let e = e.into_kind(ErrorKind::CandidateFetch);
                warn!(error = %e, "Failed to fetch drivers");
                Vec::new()
            }
        };

        let nearby = filter_by_radius(origin, &roster, self.config.radius_km);
        debug!(
            roster = roster.len(),
            nearby = nearby.len(),
            radius_km = self.config.radius_km,
            "Candidates refreshed"
        );

        *self.nearby.lock().unwrap_or_else(|p| p.into_inner()) = nearby.clone();
        nearby
    }

    /// Candidates from the last refresh, in roster order.
    pub fn nearby(&self) -> Vec<HelperCandidate> {
        self.nearby.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Candidates from the last refresh, nearest first.
    pub fn ranked_nearby(&self) -> Vec<RankedCandidate> {
        match self.store.position() {
            Some(origin) => rank_by_distance(origin, &self.nearby()),
            None => Vec::new(),
        }
    }

    /// Asks for help: create the record, open it locally, then announce it.
    ///
    /// The request slot is held across the creation call, so a second call
    /// made meanwhile fails with `Conflict` before reaching the record store.
    pub async fn request_help(&self, issue: &str) -> AppResult<HelpRequestId> {
        let Some(identity) = self.store.identity() else {
            return Err(AppError::validation(
                "No session identity; help requests are disabled",
            ));
        };
        let Some(reservation) = self.store.reserve_request() else {
            return Err(AppError::conflict(
                "A help request is already open; dismiss it first",
            ));
        };
        let Some(position) = self.store.position() else {
            let err = AppError::position_unavailable("Position unknown; cannot request help");
            self.notify(UserNotice::LocationUnavailable {
                message: err.message.clone(),
            });
            return Err(err);
        };

        let body = NewHelpRequest::new(identity.id.clone(), position, issue);
        let request = match self.api.create_help_request(&body).await {
            Ok(request) => request,
            Err(e) => {
                let e = e.into_kind(ErrorKind::RequestCreation);
                warn!(error = %e, "Help request creation failed");
                self.notify(UserNotice::RequestFailed {
                    message: e.message.clone(),
                });
                return Err(e);
            }
        };
        let request_id = request.id.clone();

        if let OpenOutcome::AlreadyOpen(open) = reservation.open(request) {
            return Err(AppError::conflict(format!(
                "Help request {open} opened while {request_id} was being created"
            )));
        }

        if let Err(e) = self.channel.emit_help_request(&request_id).await {
            // The record exists; helpers polling the store can still find it.
            warn!(request_id = %request_id, error = %e, "Failed to announce help request");
        }

        info!(request_id = %request_id, requester_id = %identity.id, "Help request sent");
        self.notify(UserNotice::RequestSent {
            request_id: request_id.clone(),
        });
        Ok(request_id)
    }

    /// Leaves `Pending` or `Matched` and returns to `Idle`.
    pub fn dismiss(&self) -> Option<HelpRequestId> {
        let cleared = self.store.clear();
        if let Some(id) = &cleared {
            info!(request_id = %id, "Help request dismissed");
        }
        cleared
    }

    /// Withdraws a pending request older than the configured timeout.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> Option<HelpRequestId> {
        let timeout = self.config.pending_timeout()?;
        let timeout = chrono::Duration::from_std(timeout).ok()?;

        let state = self.store.snapshot();
        if state.phase() != RequestPhase::Pending {
            return None;
        }
        let request = state.open_request?;
        if request.age_at(now) < timeout {
            return None;
        }

        if !self.store.clear_if_pending(&request.id) {
            return None;
        }
        info!(request_id = %request.id, "Pending help request expired");
        self.notify(UserNotice::RequestExpired {
            request_id: request.id.clone(),
        });
        Some(request.id)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RequestPhase {
        self.store.phase()
    }

    /// The rendezvous view, once matched.
    pub fn rendezvous(&self) -> Option<RendezvousView> {
        RendezvousView::from_state(&self.store.snapshot())
    }

    /// The session cell.
    pub fn session(&self) -> &SessionStore {
        &self.store
    }

    fn notify(&self, notice: UserNotice) {
        let _ = self.notices.send(notice);
    }
}

/// Applies an inbound `help-accepted` to the session, ignoring anything
/// that is not about this session's open request.
fn apply_acceptance(
    store: &SessionStore,
    notices: &mpsc::UnboundedSender<UserNotice>,
    accepted: &HelpAccepted,
) {
    let request_id = &accepted.acceptance.request_id;
    let own_id = store.identity().map(|identity| identity.id);
    if own_id.as_ref() != Some(&accepted.requester_id) {
        debug!(request_id = %request_id, "Ignoring acceptance for another requester");
        return;
    }

    match store.record_acceptance(accepted.acceptance.clone()) {
        AcceptanceOutcome::Recorded => {
            info!(
                request_id = %request_id,
                helper_id = %accepted.acceptance.helper_id,
                "Help request matched"
            );
            let _ = notices.send(UserNotice::HelpAccepted {
                helper_name: accepted.acceptance.helper_name.clone(),
                rendezvous: RendezvousView::from_state(&store.snapshot()),
            });
        }
        AcceptanceOutcome::Duplicate => {
            debug!(request_id = %request_id, "Duplicate acceptance ignored");
        }
        AcceptanceOutcome::Conflicting => {
            let e = AppError::stale_acceptance(format!(
                "Second acceptance for {request_id} by {}",
                accepted.acceptance.helper_id
            ));
            warn!(error = %e, "Conflicting acceptance ignored");
        }
        AcceptanceOutcome::Foreign => {
            let e = AppError::stale_acceptance(format!("No open request {request_id}"));
            debug!(error = %e, "Stale acceptance ignored");
        }
    }
}
