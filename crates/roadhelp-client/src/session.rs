//! Per-session state: identity, position, the open request and its acceptance.
//!
//! One [`SessionStore`] exists per connected client and is owned by that
//! client's workflow. Realtime handlers hold clones of the store; they are
//! deregistered when the owning workflow is dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, warn};

use roadhelp_core::geo::Coordinate;
use roadhelp_core::model::{Acceptance, HelpRequest, Identity};
use roadhelp_core::types::id::HelpRequestId;

/// Where the session is in the help-request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPhase {
    /// No open request.
    Idle,
    /// A request is open and waiting for a helper.
    Pending,
    /// A helper accepted the open request.
    Matched,
}

/// Snapshot of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Who the session belongs to; `None` disables the dispatch flow.
    pub identity: Option<Identity>,
    /// Last position fix.
    pub position: Option<Coordinate>,
    /// The request this session opened, if any.
    pub open_request: Option<HelpRequest>,
    /// The acceptance of the open request, if any.
    pub acceptance: Option<Acceptance>,
    /// A creation call holds the request slot.
    pub creating: bool,
}

impl SessionState {
    /// Derives the lifecycle phase.
    pub fn phase(&self) -> RequestPhase {
        match (&self.open_request, &self.acceptance) {
            (None, _) => RequestPhase::Idle,
            (Some(_), None) => RequestPhase::Pending,
            (Some(_), Some(_)) => RequestPhase::Matched,
        }
    }
}

/// Outcome of [`SessionStore::open_help_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The request is now open.
    Opened,
    /// Another request is still open; nothing changed.
    AlreadyOpen(HelpRequestId),
}

/// Outcome of [`SessionStore::record_acceptance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceOutcome {
    /// The acceptance matched the open request and is now recorded.
    Recorded,
    /// The same acceptance was already recorded.
    Duplicate,
    /// A different acceptance for the same request is already recorded.
    Conflicting,
    /// The acceptance belongs to no request this session has open.
    Foreign,
}

/// Claim on the session's single request slot while a request is being created.
///
/// Dropping it without [`RequestReservation::open`] frees the slot again.
#[derive(Debug)]
#[must_use = "dropping the reservation frees the request slot"]
pub struct RequestReservation {
    store: SessionStore,
}

impl RequestReservation {
    /// Opens the created request, consuming the reservation.
    pub fn open(self, request: HelpRequest) -> OpenOutcome {
        self.store.open_help_request(request)
    }
}

impl Drop for RequestReservation {
    fn drop(&mut self) {
        self.store.lock().creating = false;
    }
}

/// Shared, mutable session cell.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionStore {
    /// Creates a store for a fresh session. Position starts unknown.
    pub fn new(identity: Option<Identity>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                identity,
                ..SessionState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // Every mutation below is a single assignment; a poisoned cell is still consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The session identity.
    pub fn identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    /// Last known position.
    pub fn position(&self) -> Option<Coordinate> {
        self.lock().position
    }

    /// Stores a position fix. Last write wins.
    pub fn set_position(&self, position: Coordinate) {
        self.lock().position = Some(position);
    }

    /// Claims the request slot, or `None` when a request is open or being created.
    pub fn reserve_request(&self) -> Option<RequestReservation> {
        let mut state = self.lock();
        if state.creating || state.open_request.is_some() {
            return None;
        }
        state.creating = true;
        Some(RequestReservation {
            store: self.clone(),
        })
    }

    /// Opens a request unless one is already open.
    pub fn open_help_request(&self, request: HelpRequest) -> OpenOutcome {
        let mut state = self.lock();
        if let Some(open) = &state.open_request {
            warn!(
                open_request = %open.id,
                rejected_request = %request.id,
                "A help request is already open; ignoring new one"
            );
            return OpenOutcome::AlreadyOpen(open.id.clone());
        }

        debug!(request_id = %request.id, "Help request opened");
        state.open_request = Some(request);
        state.acceptance = None;
        OpenOutcome::Opened
    }

    /// Records an acceptance for the open request.
    ///
    /// The first acceptance for the open request is terminal; anything
    /// after it is reported but never replaces it.
    pub fn record_acceptance(&self, acceptance: Acceptance) -> AcceptanceOutcome {
        let mut state = self.lock();
        let Some(open) = &state.open_request else {
            return AcceptanceOutcome::Foreign;
        };
        if open.id != acceptance.request_id {
            return AcceptanceOutcome::Foreign;
        }

        match &state.acceptance {
            None => {
                state.acceptance = Some(acceptance);
                AcceptanceOutcome::Recorded
            }
            Some(existing) if *existing == acceptance => AcceptanceOutcome::Duplicate,
            Some(_) => AcceptanceOutcome::Conflicting,
        }
    }

    /// Drops the open request and its acceptance.
    pub fn clear(&self) -> Option<HelpRequestId> {
        let mut state = self.lock();
        state.acceptance = None;
        state.open_request.take().map(|request| request.id)
    }

    /// Clears the open request only if it is `request_id` and still pending.
    pub fn clear_if_pending(&self, request_id: &HelpRequestId) -> bool {
        let mut state = self.lock();
        let pending = state.phase() == RequestPhase::Pending
            && state
                .open_request
                .as_ref()
                .is_some_and(|open| open.id == *request_id);
        if pending {
            state.open_request = None;
        }
        pending
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RequestPhase {
        self.lock().phase()
    }

    /// Copy of the whole state.
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use roadhelp_core::types::id::UserId;

    use super::*;

    fn request(id: &str) -> HelpRequest {
        HelpRequest {
            id: HelpRequestId::new(id),
            requester_id: UserId::new("u1"),
            requester_position: Coordinate {
                latitude: 10.0,
                longitude: 10.0,
            },
            issue_description: "flat tyre".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    fn acceptance(request_id: &str, helper: &str) -> Acceptance {
        Acceptance {
            request_id: HelpRequestId::new(request_id),
            helper_id: UserId::new(helper),
            helper_name: helper.to_uppercase(),
            helper_position: Coordinate {
                latitude: 10.01,
                longitude: 10.0,
            },
            accepted_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 0).unwrap(),
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(Some(Identity::new("u1", "Asha")))
    }

    #[test]
    fn test_fresh_session_is_idle_without_position() {
        let store = store();
        let state = store.snapshot();
        assert_eq!(state.phase(), RequestPhase::Idle);
        assert!(state.position.is_none());
        assert_eq!(state.identity.map(|i| i.display_name), Some("Asha".to_string()));
    }

    #[test]
    fn test_position_last_write_wins() {
        let store = store();
        store.set_position(Coordinate {
            latitude: 1.0,
            longitude: 1.0,
        });
        store.set_position(Coordinate {
            latitude: 2.0,
            longitude: 3.0,
        });
        assert_eq!(store.position().map(|p| p.longitude), Some(3.0));
    }

    #[test]
    fn test_second_open_request_is_ignored() {
        let store = store();
        assert_eq!(store.open_help_request(request("r1")), OpenOutcome::Opened);
        assert_eq!(
            store.open_help_request(request("r2")),
            OpenOutcome::AlreadyOpen(HelpRequestId::new("r1"))
        );
        assert_eq!(
            store.snapshot().open_request.map(|r| r.id),
            Some(HelpRequestId::new("r1"))
        );
    }

    #[test]
    fn test_matched_request_blocks_new_one_until_cleared() {
        let store = store();
        store.open_help_request(request("r1"));
        store.record_acceptance(acceptance("r1", "h1"));
        assert_eq!(store.phase(), RequestPhase::Matched);

        assert!(matches!(
            store.open_help_request(request("r2")),
            OpenOutcome::AlreadyOpen(_)
        ));
        assert_eq!(store.clear(), Some(HelpRequestId::new("r1")));
        assert_eq!(store.open_help_request(request("r2")), OpenOutcome::Opened);
    }

    #[test]
    fn test_reservation_blocks_second_request_until_released() {
        let store = store();
        let reservation = store.reserve_request().expect("slot free");
        assert!(store.snapshot().creating);
        assert!(store.reserve_request().is_none());

        drop(reservation);
        assert!(!store.snapshot().creating);

        let reservation = store.reserve_request().expect("slot free again");
        assert_eq!(reservation.open(request("r1")), OpenOutcome::Opened);
        assert!(!store.snapshot().creating);
        assert!(store.reserve_request().is_none());
    }

    #[test]
    fn test_foreign_acceptance_leaves_state_unchanged() {
        let store = store();
        store.open_help_request(request("r1"));
        let before = store.snapshot();

        assert_eq!(
            store.record_acceptance(acceptance("r2", "h1")),
            AcceptanceOutcome::Foreign
        );
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_acceptance_without_open_request_is_foreign() {
        let store = store();
        assert_eq!(
            store.record_acceptance(acceptance("r1", "h1")),
            AcceptanceOutcome::Foreign
        );
        assert!(store.snapshot().acceptance.is_none());
    }

    #[test]
    fn test_duplicate_acceptance_is_idempotent() {
        let store = store();
        store.open_help_request(request("r1"));
        assert_eq!(
            store.record_acceptance(acceptance("r1", "h1")),
            AcceptanceOutcome::Recorded
        );
        let once = store.snapshot();

        assert_eq!(
            store.record_acceptance(acceptance("r1", "h1")),
            AcceptanceOutcome::Duplicate
        );
        assert_eq!(store.snapshot(), once);
    }

    #[test]
    fn test_first_acceptance_is_terminal() {
        let store = store();
        store.open_help_request(request("r1"));
        store.record_acceptance(acceptance("r1", "h1"));

        assert_eq!(
            store.record_acceptance(acceptance("r1", "h2")),
            AcceptanceOutcome::Conflicting
        );
        let helper = store.snapshot().acceptance.map(|a| a.helper_id);
        assert_eq!(helper, Some(UserId::new("h1")));
    }

    #[test]
    fn test_clear_if_pending_skips_matched() {
        let store = store();
        store.open_help_request(request("r1"));
        store.record_acceptance(acceptance("r1", "h1"));
        assert!(!store.clear_if_pending(&HelpRequestId::new("r1")));
        assert_eq!(store.phase(), RequestPhase::Matched);

        store.clear();
        store.open_help_request(request("r2"));
        assert!(!store.clear_if_pending(&HelpRequestId::new("r1")));
        assert!(store.clear_if_pending(&HelpRequestId::new("r2")));
        assert_eq!(store.phase(), RequestPhase::Idle);
    }
}
