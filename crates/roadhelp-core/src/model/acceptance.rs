//! Acceptance of a help request by a helper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::types::id::{HelpRequestId, UserId};

/// The authoritative record that one helper has taken one request.
///
/// At most one exists per request; the dispatch coordinator enforces
/// this. Field names follow the record store's JSON (`location`,
/// `updatedAt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acceptance {
    /// The request that was accepted.
    #[serde(alias = "helpRequestId")]
    pub request_id: HelpRequestId,
    /// The helper who accepted.
    pub helper_id: UserId,
    /// The helper's display name.
    pub helper_name: String,
    /// Where the helper was when accepting.
    #[serde(rename = "location")]
    pub helper_position: Coordinate,
    /// When the acceptance was recorded.
    #[serde(alias = "updatedAt")]
    pub accepted_at: DateTime<Utc>,
}
