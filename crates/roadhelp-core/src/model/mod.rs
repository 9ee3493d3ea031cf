//! Dispatch domain model.

pub mod acceptance;
pub mod candidate;
pub mod request;

pub use acceptance::Acceptance;
pub use candidate::{HelperCandidate, HelperStatus};
pub use request::HelpRequest;

use serde::{Deserialize, Serialize};

use crate::types::id::UserId;

/// Who a session belongs to, decoded once from the session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// User ID.
    pub id: UserId,
    /// Name shown to other parties.
    pub display_name: String,
}

impl Identity {
    /// Create a new identity.
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}
