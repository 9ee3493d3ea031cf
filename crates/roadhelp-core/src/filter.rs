//! Candidate filtering and ranking by distance from the requester.

use serde::{Deserialize, Serialize};

use crate::geo::{Coordinate, distance_km};
use crate::model::HelperCandidate;

/// Returns every candidate within `radius_km` of `origin`, in input order.
///
/// A candidate exactly on the radius is included. A negative or NaN
/// radius includes nothing.
pub fn filter_by_radius(
    origin: Coordinate,
    candidates: &[HelperCandidate],
    radius_km: f64,
) -> Vec<HelperCandidate> {
    candidates
        .iter()
        .filter(|candidate| distance_km(origin, candidate.position) <= radius_km)
        .cloned()
        .collect()
}

/// A candidate paired with its distance from the requester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// The candidate.
    pub candidate: HelperCandidate,
    /// Distance from the origin in kilometres.
    pub distance_km: f64,
}

/// Orders candidates nearest first. Equal distances keep input order.
pub fn rank_by_distance(origin: Coordinate, candidates: &[HelperCandidate]) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .map(|candidate| RankedCandidate {
            distance_km: distance_km(origin, candidate.position),
            candidate: candidate.clone(),
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HelperStatus, Identity};

    fn helper(id: &str, latitude: f64, longitude: f64) -> HelperCandidate {
        HelperCandidate {
            identity: Identity::new(id, format!("driver {id}")),
            position: Coordinate {
                latitude,
                longitude,
            },
            status: HelperStatus::Available,
        }
    }

    fn origin() -> Coordinate {
        Coordinate {
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    #[test]
    fn test_includes_helper_inside_radius() {
        let result = filter_by_radius(origin(), &[helper("a", 0.0, 0.05)], 6.0);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_excludes_helper_outside_radius() {
        let result = filter_by_radius(origin(), &[helper("b", 0.0, 0.1)], 6.0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_by_radius(origin(), &[], 6.0).is_empty());
    }

    #[test]
    fn test_preserves_input_order() {
        let candidates = vec![
            helper("far-ish", 0.0, 0.04),
            helper("out", 0.3, 0.3),
            helper("near", 0.0, 0.001),
            helper("mid", 0.02, 0.0),
        ];
        let ids: Vec<String> = filter_by_radius(origin(), &candidates, 6.0)
            .into_iter()
            .map(|c| c.identity.id.to_string())
            .collect();
        assert_eq!(ids, vec!["far-ish", "near", "mid"]);
    }

    #[test]
    fn test_result_is_exactly_the_within_radius_subset() {
        let candidates: Vec<HelperCandidate> = (0..40)
            .map(|i| {
                let step = f64::from(i) * 0.007;
                helper(&i.to_string(), step * 0.5, -step)
            })
            .collect();
        let radius = 9.0;

        let filtered = filter_by_radius(origin(), &candidates, radius);
        let expected: Vec<HelperCandidate> = candidates
            .iter()
            .filter(|c| distance_km(origin(), c.position) <= radius)
            .cloned()
            .collect();

        assert_eq!(filtered, expected);
        assert!(filtered
            .iter()
            .all(|c| distance_km(origin(), c.position) <= radius));
    }

    #[test]
    fn test_invalid_radius_includes_nothing() {
        let candidates = vec![helper("a", 0.0, 0.0)];
        assert!(filter_by_radius(origin(), &candidates, -1.0).is_empty());
        assert!(filter_by_radius(origin(), &candidates, f64::NAN).is_empty());
    }

    #[test]
    fn test_rank_nearest_first_stable_ties() {
        let candidates = vec![
            helper("far", 0.0, 0.09),
            helper("tie-1", 0.0, 0.01),
            helper("near", 0.0, 0.001),
            helper("tie-2", 0.0, -0.01),
        ];
        let ranked: Vec<String> = rank_by_distance(origin(), &candidates)
            .into_iter()
            .map(|r| r.candidate.identity.id.to_string())
            .collect();
        assert_eq!(ranked, vec!["near", "tie-1", "tie-2", "far"]);
    }
}
