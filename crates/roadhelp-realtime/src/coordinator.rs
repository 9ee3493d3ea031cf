//! Dispatch coordinator: the authority on who owns a request and who took it.
//!
//! Holds request ownership and acceptances in memory. The durable records
//! live in the external record store; this is the serialization point
//! that keeps the realtime fan-out to at most one acceptance per request.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use roadhelp_core::error::AppError;
use roadhelp_core::model::Acceptance;
use roadhelp_core::types::id::{HelpRequestId, UserId};

/// An announced help request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncedRequest {
    /// Who announced it.
    pub requester_id: UserId,
    /// When it was first announced.
    pub announced_at: DateTime<Utc>,
}

/// Result of an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    /// First announcement of this request.
    New,
    /// The same requester announced it again.
    Repeated,
}

/// Result of an acceptance claim.
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptOutcome {
    /// The claim won; it is now the request's acceptance.
    Accepted(Acceptance),
    /// The request already had an acceptance; it is returned unchanged.
    AlreadyAccepted(Acceptance),
}

/// Serializes acceptances per request.
#[derive(Debug, Default)]
pub struct DispatchCoordinator {
    requests: DashMap<HelpRequestId, AnnouncedRequest>,
    acceptances: DashMap<HelpRequestId, Acceptance>,
}

impl DispatchCoordinator {
    /// Creates an empty coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `requester_id` owns `request_id`.
    ///
    /// Fails with a conflict if another user already announced the same ID.
    pub fn announce(
        &self,
        request_id: HelpRequestId,
        requester_id: UserId,
    ) -> Result<Announcement, AppError> {
        match self.requests.entry(request_id) {
            Entry::Occupied(existing) => {
                if existing.get().requester_id == requester_id {
                    Ok(Announcement::Repeated)
                } else {
                    Err(AppError::conflict(format!(
                        "Help request {} belongs to another user",
                        existing.key()
                    )))
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(AnnouncedRequest {
                    requester_id,
                    announced_at: Utc::now(),
                });
                Ok(Announcement::New)
            }
        }
    }

    /// Claims a request for a helper. The first claim per request wins.
    pub fn accept(&self, acceptance: Acceptance) -> AcceptOutcome {
        match self.acceptances.entry(acceptance.request_id.clone()) {
            Entry::Occupied(existing) => AcceptOutcome::AlreadyAccepted(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(acceptance.clone());
                AcceptOutcome::Accepted(acceptance)
            }
        }
    }

    /// Who announced a request, if it was announced.
    pub fn requester_of(&self, request_id: &HelpRequestId) -> Option<UserId> {
        self.requests
            .get(request_id)
            .map(|entry| entry.requester_id.clone())
    }

    /// The acceptance of a request, if any.
    pub fn acceptance_for(&self, request_id: &HelpRequestId) -> Option<Acceptance> {
        self.acceptances.get(request_id).map(|entry| entry.clone())
    }

    /// Drops unaccepted announcements older than `cutoff`. Returns how many.
    pub fn prune_unaccepted(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.requests.len();
        self.requests.retain(|id, announced| {
            announced.announced_at >= cutoff || self.acceptances.contains_key(id)
        });
        before - self.requests.len()
    }

    /// Forgets matched requests whose acceptance is older than `cutoff`.
    ///
    /// Both the announcement and the acceptance are dropped; a later claim
    /// for the same ID is answered as an unknown request. Returns how many.
    pub fn prune_settled(&self, cutoff: DateTime<Utc>) -> usize {
        let mut settled = Vec::new();
        self.acceptances.retain(|id, acceptance| {
            let keep = acceptance.accepted_at >= cutoff;
            if !keep {
                settled.push(id.clone());
            }
            keep
        });
        for id in &settled {
            self.requests.remove(id);
        }
        settled.len()
    }
}
