//! Helper candidates produced by the roster query.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

use super::Identity;

/// Availability of a helper as reported by the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperStatus {
    /// Free to take a request.
    Available,
    /// Currently on another job.
    Busy,
    /// Not reachable.
    Offline,
}

impl HelperStatus {
    /// Parses a roster status string. Unknown values count as offline.
    pub fn from_str_or_offline(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "available" | "active" | "online" => Self::Available,
            "busy" => Self::Busy,
            _ => Self::Offline,
        }
    }

    /// Returns the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for HelperStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A helper known to the roster, with last reported position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperCandidate {
    /// Who the helper is.
    pub identity: Identity,
    /// Last reported position.
    pub position: Coordinate,
    /// Availability.
    pub status: HelperStatus,
}
