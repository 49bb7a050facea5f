//! Request shaping for "routes similar to this one".
//!
//! The matching itself happens on the backend. The client only decides which
//! parameters to send; for the distance dimension that includes the tolerance
//! band around the reference route's distance.

use crate::entities::RouteSummary;
use crate::enums::Similarity;
use crate::identity::RouteId;
use serde::{Deserialize, Serialize};

/// Distance (meters) from which the tolerance band narrows to a quarter.
pub const DISTANCE_DELTA_THRESHOLD: u32 = 500;

/// Tolerance band, in meters, for distance-similar routes.
///
/// Routes of at least [`DISTANCE_DELTA_THRESHOLD`] meters get a quarter of
/// their distance; shorter routes get their full distance so the band is wide
/// enough to match anything at all. Meters are whole numbers on the wire, so
/// the quarter is truncated.
pub fn compute_distance_delta(distance: u32) -> u32 {
    if distance >= DISTANCE_DELTA_THRESHOLD {
        distance / 4
    } else {
        distance
    }
}

/// Parameters for one related-routes lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelatedRoutesRequest {
    pub route_id: RouteId,
    pub similarity: Similarity,
    /// Maximum number of routes; `None` lets the backend decide.
    pub limit: Option<u32>,
    /// Only ever set for [`Similarity::Distance`].
    pub distance_delta: Option<u32>,
}

impl RelatedRoutesRequest {
    /// Shape the request for `route` along `similarity`. Zero limits and zero
    /// deltas are left out of the request.
    pub fn for_route(route: &RouteSummary, similarity: Similarity, limit: u32) -> Self {
        let distance_delta = match similarity {
            Similarity::Distance => Some(compute_distance_delta(route.distance)),
            Similarity::SkillLevel | Similarity::Categories => None,
        };
        Self {
            route_id: route.id,
            similarity,
            limit: Some(limit).filter(|l| *l > 0),
            distance_delta: distance_delta.filter(|d| *d > 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::SkillLevel;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn route(distance: u32) -> RouteSummary {
        RouteSummary {
            id: RouteId::new(11),
            title: "Ridge".to_string(),
            distance,
            elevation: 120,
            duration: 45,
            difficulty: SkillLevel::Medium,
            categories: BTreeSet::new(),
            author: "ana".to_string(),
            kudos: 0,
            blocked: false,
        }
    }

    #[test]
    fn test_delta_boundary_values() {
        assert_eq!(compute_distance_delta(499), 499);
        assert_eq!(compute_distance_delta(500), 125);
        assert_eq!(compute_distance_delta(2000), 500);
    }

    #[test]
    fn test_delta_short_routes_keep_full_distance() {
        assert_eq!(compute_distance_delta(0), 0);
        assert_eq!(compute_distance_delta(1), 1);
    }

    #[test]
    fn test_request_for_distance_carries_delta() {
        let request = RelatedRoutesRequest::for_route(&route(2_000), Similarity::Distance, 3);
        assert_eq!(request.route_id, RouteId::new(11));
        assert_eq!(request.limit, Some(3));
        assert_eq!(request.distance_delta, Some(500));
    }

    #[test]
    fn test_request_for_exact_dimensions_has_no_delta() {
        for similarity in [Similarity::SkillLevel, Similarity::Categories] {
            let request = RelatedRoutesRequest::for_route(&route(2_000), similarity, 3);
            assert_eq!(request.distance_delta, None);
        }
    }

    #[test]
    fn test_request_omits_zero_limit_and_delta() {
        let request = RelatedRoutesRequest::for_route(&route(0), Similarity::Distance, 0);
        assert_eq!(request.limit, None);
        assert_eq!(request.distance_delta, None);
    }

    proptest! {
        #[test]
        fn delta_never_exceeds_distance(distance in 0u32..10_000_000) {
            prop_assert!(compute_distance_delta(distance) <= distance);
        }

        #[test]
        fn long_routes_use_quarter(distance in DISTANCE_DELTA_THRESHOLD..10_000_000u32) {
            prop_assert_eq!(compute_distance_delta(distance), distance / 4);
        }

        #[test]
        fn short_routes_use_identity(distance in 0u32..DISTANCE_DELTA_THRESHOLD) {
            prop_assert_eq!(compute_distance_delta(distance), distance);
        }
    }
}
