//! Rutastic Test Utilities
//!
//! Shared test infrastructure for the Rutastic workspace:
//! - An in-memory backend with failure and latency injection
//! - Proptest generators for domain types
//! - Fixtures for common scenarios
//! - Assertions for cache-consistency checks

pub mod mock;

pub use mock::{MockBackend, MockOp, LEADERBOARD_SIZE};

// Re-export core types for convenience
pub use rutastic_core::{
    AuthorStat, BackendError, BoundRange, Identity, KudoEntry, KudoOrdering, KudoOverlay,
    RouteId, RouteQuery, RouteSummary, SkillLevel, VoteDirection,
};

use std::collections::BTreeSet;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Rutastic domain types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_route_id() -> impl Strategy<Value = RouteId> {
        (1i64..10_000).prop_map(RouteId::new)
    }

    pub fn arb_skill_level() -> impl Strategy<Value = SkillLevel> {
        prop_oneof![
            Just(SkillLevel::Easy),
            Just(SkillLevel::Medium),
            Just(SkillLevel::Hard),
        ]
    }

    pub fn arb_ordering() -> impl Strategy<Value = KudoOrdering> {
        prop_oneof![
            Just(KudoOrdering::Unordered),
            Just(KudoOrdering::Ascending),
            Just(KudoOrdering::Descending),
        ]
    }

    pub fn arb_username() -> impl Strategy<Value = String> {
        prop_oneof![Just("ana"), Just("leo"), Just("marta"), Just("iker")]
            .prop_map(str::to_string)
    }

    pub fn arb_category() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("trail"),
            Just("montaña"),
            Just("costa"),
            Just("bosque"),
        ]
        .prop_map(str::to_string)
    }

    pub fn arb_categories() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set(arb_category(), 0..3)
    }

    /// Ranges with `min <= max` whenever both bounds are present.
    pub fn arb_bound_range(limit: u32) -> impl Strategy<Value = BoundRange> {
        (
            prop::option::of(0..=limit),
            prop::option::of(0..=limit),
        )
            .prop_map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => BoundRange::between(a.min(b), a.max(b)),
                (a, b) => BoundRange::new(a, b),
            })
    }

    pub fn arb_route_summary() -> impl Strategy<Value = RouteSummary> {
        (
            arb_route_id(),
            "[A-Z][a-z]{2,10}",
            0u32..30_000,
            0u32..2_000,
            1u32..600,
            arb_skill_level(),
            arb_categories(),
            arb_username(),
            -20i64..50,
            any::<bool>(),
        )
            .prop_map(
                |(id, title, distance, elevation, duration, difficulty, categories, author, kudos, blocked)| {
                    RouteSummary {
                        id,
                        title,
                        distance,
                        elevation,
                        duration,
                        difficulty,
                        categories,
                        author,
                        kudos,
                        blocked,
                    }
                },
            )
    }

    /// Catalogs with unique ids.
    pub fn arb_catalog(max: usize) -> impl Strategy<Value = Vec<RouteSummary>> {
        prop::collection::btree_map(arb_route_id(), arb_route_summary(), 0..max).prop_map(
            |routes| {
                routes
                    .into_iter()
                    .map(|(id, route)| RouteSummary { id, ..route })
                    .collect()
            },
        )
    }

    /// Queries that pass validation.
    pub fn arb_route_query() -> impl Strategy<Value = RouteQuery> {
        (
            prop::option::of(prop_oneof![
                Just("ridge".to_string()),
                Just("lago;cumbre".to_string()),
                Just("Ruta".to_string()),
            ]),
            prop::option::of(arb_username()),
            arb_categories(),
            arb_bound_range(30_000),
            arb_bound_range(600),
            prop::option::of(arb_skill_level()),
            arb_ordering(),
            prop::option::of(-5i64..10),
            any::<bool>(),
        )
            .prop_map(
                |(text, author, categories, distance, duration, difficulty, ordering, min_kudos, hide_blocked)| {
                    RouteQuery {
                        text,
                        author,
                        categories,
                        distance,
                        duration,
                        difficulty,
                        ordering,
                        min_kudos,
                        hide_blocked,
                        only_mine: false,
                    }
                },
            )
    }

    pub fn arb_vote_direction() -> impl Strategy<Value = VoteDirection> {
        prop_oneof![Just(VoteDirection::Up), Just(VoteDirection::Down)]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common testing scenarios.

    use super::*;

    pub const PASSWORD: &str = "correct horse";

    pub fn ana() -> Identity {
        Identity::new("ana").with_email("ana@rutastic.test")
    }

    pub fn leo() -> Identity {
        Identity::new("leo").with_email("leo@rutastic.test")
    }

    pub fn route(
        id: i64,
        title: &str,
        distance: u32,
        difficulty: SkillLevel,
        author: &str,
    ) -> RouteSummary {
        RouteSummary {
            id: RouteId::new(id),
            title: title.to_string(),
            distance,
            elevation: distance / 10,
            duration: distance / 60 + 10,
            difficulty,
            categories: BTreeSet::new(),
            author: author.to_string(),
            kudos: 0,
            blocked: false,
        }
    }

    pub fn with_categories(mut route: RouteSummary, categories: &[&str]) -> RouteSummary {
        route.categories = categories.iter().map(|c| c.to_string()).collect();
        route
    }

    pub fn with_kudos(mut route: RouteSummary, kudos: i64) -> RouteSummary {
        route.kudos = kudos;
        route
    }

    /// Six routes across every difficulty, two authors and a blocked one.
    pub fn sample_catalog() -> Vec<RouteSummary> {
        vec![
            with_kudos(
                with_categories(route(1, "Ridge loop", 2_000, SkillLevel::Medium, "ana"), &["montaña"]),
                3,
            ),
            with_kudos(
                with_categories(route(2, "Lago azul", 1_800, SkillLevel::Easy, "leo"), &["trail", "costa"]),
                1,
            ),
            with_categories(route(3, "Cumbre norte", 12_000, SkillLevel::Hard, "ana"), &["montaña"]),
            with_kudos(route(4, "Ruta del bosque", 2_400, SkillLevel::Medium, "leo"), 5),
            route(5, "Paseo corto", 400, SkillLevel::Easy, "marta"),
            {
                let mut blocked = route(6, "Ruta cerrada", 2_100, SkillLevel::Medium, "marta");
                blocked.blocked = true;
                blocked
            },
        ]
    }

    /// Mock seeded with [`sample_catalog`] and the two fixture accounts.
    pub fn sample_backend() -> MockBackend {
        let backend = MockBackend::with_routes(sample_catalog());
        backend.register_user(ana(), PASSWORD);
        backend.register_user(leo(), PASSWORD);
        backend
    }

    pub fn medium_query() -> RouteQuery {
        RouteQuery::all().with_difficulty(SkillLevel::Medium)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for cache-consistency checks.

    use super::*;

    /// Assert two route lists hold the same routes in the same order.
    #[track_caller]
    pub fn assert_same_routes(actual: &[RouteSummary], expected: &[RouteSummary]) {
        let actual_ids: Vec<RouteId> = actual.iter().map(|r| r.id).collect();
        let expected_ids: Vec<RouteId> = expected.iter().map(|r| r.id).collect();
        assert_eq!(actual_ids, expected_ids, "Route lists differ");
        assert_eq!(actual, expected, "Route contents differ");
    }

    /// Assert every route in `routes` has the given difficulty.
    #[track_caller]
    pub fn assert_all_difficulty(routes: &[RouteSummary], difficulty: SkillLevel) {
        for route in routes {
            assert_eq!(
                route.difficulty, difficulty,
                "Route {} has difficulty {}, expected {}",
                route.id, route.difficulty, difficulty
            );
        }
    }

    /// Assert the overlay holds exactly these (route, modifier) pairs.
    #[track_caller]
    pub fn assert_overlay_eq(overlay: &KudoOverlay, expected: &[(i64, i8)]) {
        let actual: Vec<(i64, i8)> = overlay.iter().map(|(id, m)| (id.as_i64(), m)).collect();
        let mut expected = expected.to_vec();
        expected.sort();
        assert_eq!(actual, expected, "Overlay differs");
    }

    /// Assert the route's balance in `routes` equals `kudos`.
    #[track_caller]
    pub fn assert_balance(routes: &[RouteSummary], route_id: i64, kudos: i64) {
        let route = routes
            .iter()
            .find(|r| r.id == RouteId::new(route_id))
            .unwrap_or_else(|| panic!("Route {} not in list", route_id));
        assert_eq!(route.kudos, kudos, "Balance of route {}", route_id);
    }
}

// ============================================================================
// TESTS
// ============================================================================
