//! What the requester sees once a helper is on the way.

use chrono::{DateTime, Utc};
use serde::Serialize;

use roadhelp_core::geo::{Coordinate, distance_km};
use roadhelp_core::types::id::{HelpRequestId, UserId};

use crate::session::SessionState;

/// Read-only projection of a matched session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendezvousView {
    /// The matched request.
    pub request_id: HelpRequestId,
    /// What the requester reported.
    pub issue: String,
    /// The requester's display name, when the session has an identity.
    pub requester_name: Option<String>,
    /// Who is coming.
    pub helper_id: UserId,
    /// The helper's display name.
    pub helper_name: String,
    /// Where the helper was when they accepted.
    pub helper_position: Coordinate,
    /// The requester's last position fix.
    pub requester_position: Coordinate,
    /// Live distance between the two positions, in kilometres.
    pub distance_km: f64,
    /// When the helper accepted.
    pub accepted_at: DateTime<Utc>,
}

impl RendezvousView {
    /// Builds the view for a matched session with a known position.
    pub fn from_state(state: &SessionState) -> Option<Self> {
        let request = state.open_request.as_ref()?;
        let acceptance = state.acceptance.as_ref()?;
        let requester_position = state.position?;

        Some(Self {
            request_id: request.id.clone(),
            issue: request.issue_description.clone(),
            requester_name: state.identity.as_ref().map(|i| i.display_name.clone()),
            helper_id: acceptance.helper_id.clone(),
            helper_name: acceptance.helper_name.clone(),
            helper_position: acceptance.helper_position,
            requester_position,
            distance_km: distance_km(acceptance.helper_position, requester_position),
            accepted_at: acceptance.accepted_at,
        })
    }

    /// The two ends of the line drawn between requester and helper.
    pub fn route(&self) -> [Coordinate; 2] {
        [self.requester_position, self.helper_position]
    }
}

impl std::fmt::Display for RendezvousView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is {:.2} km away ({}), accepted at {}",
            self.helper_name,
            self.distance_km,
            self.helper_position,
            self.accepted_at.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use roadhelp_core::model::{Acceptance, HelpRequest, Identity};

    use super::*;

    fn matched_state(position: Option<Coordinate>) -> SessionState {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        SessionState {
            identity: Some(Identity::new("u1", "Asha")),
            position,
            open_request: Some(HelpRequest {
                id: HelpRequestId::new("r1"),
                requester_id: UserId::new("u1"),
                requester_position: Coordinate {
                    latitude: 10.0,
                    longitude: 10.0,
                },
                issue_description: "flat tyre".to_string(),
                created_at: at,
            }),
            acceptance: Some(Acceptance {
                request_id: HelpRequestId::new("r1"),
                helper_id: UserId::new("h1"),
                helper_name: "Ravi".to_string(),
                helper_position: Coordinate {
                    latitude: 10.0,
                    longitude: 10.0,
                },
                accepted_at: at,
            }),
            creating: false,
        }
    }

    #[test]
    fn test_view_needs_a_position() {
        assert!(RendezvousView::from_state(&matched_state(None)).is_none());
    }

    #[test]
    fn test_view_serializes_every_field() {
        let here = Coordinate {
            latitude: 10.0,
            longitude: 10.0,
        };
        let view = RendezvousView::from_state(&matched_state(Some(here))).expect("matched");
        assert_eq!(view.distance_km, 0.0);
        assert_eq!(view.requester_name.as_deref(), Some("Asha"));

        let json = serde_json::to_value(&view).expect("serialize");
        for key in [
            "requestId",
            "issue",
            "requesterName",
            "helperId",
            "helperName",
            "helperPosition",
            "requesterPosition",
            "distanceKm",
            "acceptedAt",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
