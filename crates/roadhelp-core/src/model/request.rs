//! Help requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::types::id::{HelpRequestId, UserId};

/// A help request as known to the requester.
///
/// Created once per "Need Help" action from the record store's creation
/// response. The body never changes afterwards; an acceptance is tracked
/// separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequest {
    /// Server-assigned request ID.
    pub id: HelpRequestId,
    /// Who asked for help.
    pub requester_id: UserId,
    /// Where the requester was when asking.
    pub requester_position: Coordinate,
    /// What went wrong, as typed by the requester.
    pub issue_description: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl HelpRequest {
    /// How long the request has been open at `now`.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}
