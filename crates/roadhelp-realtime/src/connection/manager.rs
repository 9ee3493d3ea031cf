//! Connection manager: connection lifecycle and routing of dispatch events.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use roadhelp_core::config::RealtimeConfig;
use roadhelp_core::events::{AcceptHelp, ClientEvent, HelpAccepted, ServerEvent};
use roadhelp_core::model::Identity;
use roadhelp_core::types::id::{HelpRequestId, UserId};

use crate::channel::registry::ChannelRegistry;
use crate::channel::types::ChannelType;
use crate::coordinator::{AcceptOutcome, Announcement, DispatchCoordinator};
use crate::message::serializer::{decode_client_event, encode_server_event};
use crate::message::validator::{validate_claim, validate_inbound};
use crate::metrics::RealtimeMetrics;

use super::handle::{ConnectionHandle, ConnectionId, ConnectionInfo};
use super::pool::ConnectionPool;

/// Manages all active WebSocket connections.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Channel registry.
    channels: Arc<ChannelRegistry>,
    /// Request ownership and acceptance authority.
    coordinator: Arc<DispatchCoordinator>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        channels: Arc<ChannelRegistry>,
        coordinator: Arc<DispatchCoordinator>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new()),
            channels,
            coordinator,
            metrics,
            config,
        }
    }

    /// Registers a new authenticated connection.
    ///
    /// Returns the connection handle and a receiver for outbound frames.
    pub fn register(&self, identity: Identity) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(identity, tx));

        let existing = self.pool.get_user_connections(handle.user_id());
        if existing.len() >= self.config.max_connections_per_user {
            warn!(
                user_id = %handle.user_id(),
                count = existing.len(),
                max = self.config.max_connections_per_user,
                "User at max connections, oldest will be replaced"
            );
            if let Some(oldest) = existing.first() {
                self.unregister(&oldest.id);
            }
        }

        self.pool.add(handle.clone());
        self.channels
            .subscribe(&ChannelType::User(handle.user_id().clone()), handle.id);
        self.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            user_id = %handle.user_id(),
            "Realtime connection registered"
        );

        (handle, rx)
    }

    /// Unregisters a connection and cleans up subscriptions.
    pub fn unregister(&self, conn_id: &ConnectionId) {
        if let Some(handle) = self.pool.remove(conn_id) {
            handle.mark_dead();
            self.channels.unsubscribe_all(*conn_id);
            self.metrics.connection_closed();

            info!(
                conn_id = %conn_id,
                user_id = %handle.user_id(),
                "Realtime connection unregistered"
            );
        }
    }

    /// Processes an inbound frame from a client.
    pub async fn handle_inbound(&self, conn_id: &ConnectionId, raw: &str) {
        let Some(handle) = self.pool.get(conn_id) else {
            warn!(conn_id = %conn_id, "Frame from unknown connection");
            return;
        };

        handle.touch().await;
        self.metrics.frame_received();

        if let Err(e) = validate_inbound(raw, self.config.max_message_bytes) {
            self.reject(&handle, "INVALID_MESSAGE", &e.message);
            return;
        }

        let event = match decode_client_event(raw) {
            Ok(event) => event,
            Err(e) => {
                self.reject(&handle, "INVALID_MESSAGE", &format!("Failed to parse message: {e}"));
                return;
            }
        };

        debug!(conn_id = %conn_id, event = event.name(), "Inbound event");

        match event {
            ClientEvent::SendHelpRequest { help_request_id } => {
                self.handle_help_request(&handle, help_request_id);
            }
            ClientEvent::AcceptHelp(claim) => {
                self.handle_accept(&handle, claim);
            }
            ClientEvent::Pong { .. } => {
                handle.record_pong().await;
            }
        }
    }

    /// Announces a request and wakes every other client.
    fn handle_help_request(&self, handle: &ConnectionHandle, request_id: HelpRequestId) {
        let requester_id = handle.user_id().clone();
        match self
            .coordinator
            .announce(request_id.clone(), requester_id.clone())
        {
            Ok(Announcement::New) => self.metrics.request_announced(),
            Ok(Announcement::Repeated) => {
                debug!(request_id = %request_id, "Help request announced again");
            }
            Err(e) => {
                self.reject(handle, "REQUEST_OWNED", &e.message);
                return;
            }
        }

        self.channels
            .subscribe(&ChannelType::Request(request_id.clone()), handle.id);

        let event = ServerEvent::HelpRequested {
            help_request_id: request_id.clone(),
            requester_id: requester_id.clone(),
        };
        let sent = self.broadcast_except_user(&event, &requester_id);

        info!(
            request_id = %request_id,
            requester_id = %requester_id,
            delivered = sent,
            "Help request announced"
        );
    }

    /// Resolves an acceptance claim and publishes the winner.
    fn handle_accept(&self, handle: &ConnectionHandle, claim: AcceptHelp) {
        if let Err(e) = validate_claim(handle, &claim) {
            self.reject(handle, "INVALID_ACCEPTANCE", &e.message);
            return;
        }

        let request_id = claim.acceptance.request_id.clone();
        // The announcer is authoritative; the helper's word is the fallback
        // for requests announced before a dispatcher restart.
        let Some(requester_id) = self
            .coordinator
            .requester_of(&request_id)
            .or_else(|| claim.requester_id.clone())
        else {
            self.reject(
                handle,
                "UNKNOWN_REQUEST",
                &format!("Help request {request_id} was never announced"),
            );
            return;
        };

        match self.coordinator.accept(claim.acceptance.clone()) {
            AcceptOutcome::Accepted(acceptance) => {
                self.metrics.acceptance_recorded();
                self.channels
                    .subscribe(&ChannelType::Request(request_id.clone()), handle.id);

                let event = ServerEvent::HelpAccepted(HelpAccepted::from_claim(
                    claim,
                    requester_id.clone(),
                ));
                let sent = if self.config.scope_acceptances {
                    self.send_to_request(&request_id, &requester_id, &event)
                } else {
                    self.broadcast_all(&event)
                };

                info!(
                    request_id = %request_id,
                    helper_id = %acceptance.helper_id,
                    requester_id = %requester_id,
                    delivered = sent,
                    "Help request accepted"
                );
            }
            AcceptOutcome::AlreadyAccepted(existing)
                if existing.helper_id == claim.acceptance.helper_id =>
            {
                // The winner re-sending its claim: confirm the recorded one to them only.
                let claim = AcceptHelp {
                    acceptance: existing,
                    ..claim
                };
                let event = ServerEvent::HelpAccepted(HelpAccepted::from_claim(claim, requester_id));
                if let Ok(frame) = encode_server_event(&event) {
                    if handle.send(frame) {
                        self.metrics.frames_sent(1);
                    }
                }
            }
            AcceptOutcome::AlreadyAccepted(existing) => {
                self.metrics.acceptance_rejected();
                warn!(
                    request_id = %request_id,
                    helper_id = %handle.user_id(),
                    winner_id = %existing.helper_id,
                    "Late acceptance rejected"
                );
                self.reject(
                    handle,
                    "ALREADY_ACCEPTED",
                    &format!("Help request {request_id} was already accepted"),
                );
            }
        }
    }

    /// Sends an error frame back to one connection.
    fn reject(&self, handle: &ConnectionHandle, code: &str, message: &str) {
        self.metrics.frame_rejected();
        debug!(conn_id = %handle.id, code = code, message = message, "Rejecting client frame");
        if let Ok(frame) = encode_server_event(&ServerEvent::error(code, message)) {
            handle.send(frame);
        }
    }

    /// Sends an event to the requester's connections and the request room.
    fn send_to_request(
        &self,
        request_id: &HelpRequestId,
        requester_id: &UserId,
        event: &ServerEvent,
    ) -> usize {
        let mut targets: HashSet<ConnectionId> = self
            .channels
            .subscribers(&ChannelType::User(requester_id.clone()))
            .into_iter()
            .collect();
        targets.extend(
            self.channels
                .subscribers(&ChannelType::Request(request_id.clone())),
        );
        let targets: Vec<ConnectionId> = targets.into_iter().collect();
        self.deliver(&targets, event)
    }

    /// Broadcasts an event to every connection. Returns frames queued.
    pub fn broadcast_all(&self, event: &ServerEvent) -> usize {
        let targets: Vec<ConnectionId> = self.pool.all_connections().iter().map(|c| c.id).collect();
        self.deliver(&targets, event)
    }

    /// Broadcasts to every connection not owned by `user_id`.
    fn broadcast_except_user(&self, event: &ServerEvent, user_id: &UserId) -> usize {
        let targets: Vec<ConnectionId> = self
            .pool
            .all_connections()
            .iter()
            .filter(|c| c.user_id() != user_id)
            .map(|c| c.id)
            .collect();
        self.deliver(&targets, event)
    }

    fn deliver(&self, targets: &[ConnectionId], event: &ServerEvent) -> usize {
        let frame = match encode_server_event(event) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, event = event.name(), "Failed to serialize outbound event");
                return 0;
            }
        };

        let mut sent = 0usize;
        for conn_id in targets {
            if let Some(handle) = self.pool.get(conn_id) {
                if handle.send(frame.clone()) {
                    sent += 1;
                }
            }
        }

        self.metrics.frames_sent(sent as u64);
        sent
    }

    /// Closes all connections.
    pub fn close_all(&self) {
        let all = self.pool.all_connections();
        for conn in &all {
            self.unregister(&conn.id);
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Snapshots every live connection.
    pub async fn connection_infos(&self) -> Vec<ConnectionInfo> {
        let mut infos = Vec::new();
        for handle in self.pool.all_connections() {
            infos.push(handle.info().await);
        }
        infos.sort_by_key(|info| info.connected_at);
        infos
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    /// Returns the realtime configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}
