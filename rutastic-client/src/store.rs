//! Query state: the latest filter, its routes, and the leaderboards.
//!
//! The store is the only writer of these caches. Every mutation elsewhere in
//! the client restores consistency by calling [`QueryStateStore::refresh_filter`],
//! which re-reads everything instead of patching.

use crate::error::ClientResult;
use crate::overlay::KudoOverlayResolver;
use crate::sequencer::{RequestSequencer, Sequenced};
use chrono::Utc;
use rutastic_core::{
    AuthorStat, BackendResult, KudoOverlay, LeaderboardBackend, RouteBackend, RouteQuery,
    RouteSummary, Timestamp,
};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

pub use crate::sequencer::StaleResponsePolicy;

/// Which of the four ranked lists a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardKind {
    AuthorsByRouteCount,
    AuthorsByAvgRating,
    RoutesThisWeek,
    RoutesThisMonth,
}

impl LeaderboardKind {
    pub const ALL: [LeaderboardKind; 4] = [
        LeaderboardKind::AuthorsByRouteCount,
        LeaderboardKind::AuthorsByAvgRating,
        LeaderboardKind::RoutesThisWeek,
        LeaderboardKind::RoutesThisMonth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardKind::AuthorsByRouteCount => "authors_by_route_count",
            LeaderboardKind::AuthorsByAvgRating => "authors_by_avg_rating",
            LeaderboardKind::RoutesThisWeek => "routes_this_week",
            LeaderboardKind::RoutesThisMonth => "routes_this_month",
        }
    }
}

/// One cached ranked list with its last good value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard<T> {
    entries: Vec<T>,
    refreshed_at: Option<Timestamp>,
    last_error: Option<String>,
}

impl<T> Default for Leaderboard<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            refreshed_at: None,
            last_error: None,
        }
    }
}

impl<T> Leaderboard<T> {
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// When the entries were last replaced by a successful fetch.
    pub fn refreshed_at(&self) -> Option<Timestamp> {
        self.refreshed_at
    }

    /// The error of the most recent fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.refreshed_at.is_some()
    }

    /// Fold one fetch outcome into the slot. Failures are logged and keep the
    /// previous entries.
    fn record(&mut self, kind: LeaderboardKind, outcome: BackendResult<Vec<T>>, now: Timestamp) {
        match outcome {
            Ok(entries) => {
                debug!(leaderboard = kind.as_str(), count = entries.len(), "Leaderboard refreshed");
                self.entries = entries;
                self.refreshed_at = Some(now);
                self.last_error = None;
            }
            Err(err) => {
                warn!(leaderboard = kind.as_str(), error = %err, "Leaderboard refresh failed");
                self.last_error = Some(err.to_string());
            }
        }
    }
}

/// The four leaderboards, each cached independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeaderboardCache {
    pub authors_by_route_count: Leaderboard<AuthorStat>,
    pub authors_by_avg_rating: Leaderboard<AuthorStat>,
    pub routes_this_week: Leaderboard<RouteSummary>,
    pub routes_this_month: Leaderboard<RouteSummary>,
}

impl LeaderboardCache {
    pub fn last_error(&self, kind: LeaderboardKind) -> Option<&str> {
        match kind {
            LeaderboardKind::AuthorsByRouteCount => self.authors_by_route_count.last_error(),
            LeaderboardKind::AuthorsByAvgRating => self.authors_by_avg_rating.last_error(),
            LeaderboardKind::RoutesThisWeek => self.routes_this_week.last_error(),
            LeaderboardKind::RoutesThisMonth => self.routes_this_month.last_error(),
        }
    }

    pub fn refreshed_at(&self, kind: LeaderboardKind) -> Option<Timestamp> {
        match kind {
            LeaderboardKind::AuthorsByRouteCount => self.authors_by_route_count.refreshed_at(),
            LeaderboardKind::AuthorsByAvgRating => self.authors_by_avg_rating.refreshed_at(),
            LeaderboardKind::RoutesThisWeek => self.routes_this_week.refreshed_at(),
            LeaderboardKind::RoutesThisMonth => self.routes_this_month.refreshed_at(),
        }
    }
}

#[derive(Debug, Default)]
struct QueryState {
    latest_query: RouteQuery,
    routes: Sequenced<Vec<RouteSummary>>,
}

pub struct QueryStateStore {
    routes_backend: Arc<dyn RouteBackend>,
    leaderboards_backend: Arc<dyn LeaderboardBackend>,
    overlay: Arc<KudoOverlayResolver>,
    policy: StaleResponsePolicy,
    sequencer: RequestSequencer,
    state: RwLock<QueryState>,
    leaderboards: RwLock<LeaderboardCache>,
}

impl QueryStateStore {
    pub fn new(
        routes_backend: Arc<dyn RouteBackend>,
        leaderboards_backend: Arc<dyn LeaderboardBackend>,
        overlay: Arc<KudoOverlayResolver>,
    ) -> Self {
        Self {
            routes_backend,
            leaderboards_backend,
            overlay,
            policy: StaleResponsePolicy::default(),
            sequencer: RequestSequencer::new(),
            state: RwLock::new(QueryState::default()),
            leaderboards: RwLock::new(LeaderboardCache::default()),
        }
    }

    pub fn with_policy(mut self, policy: StaleResponsePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> StaleResponsePolicy {
        self.policy
    }

    /// Run `query` and bring every cache in line with it.
    ///
    /// The query is validated first; an invalid one is rejected before it
    /// becomes the latest query and before any request goes out. The routes
    /// are fetched next. Once that settles, leaderboards and (when someone is
    /// signed in) the kudo overlay are refreshed concurrently. The result is
    /// the route fetch outcome; leaderboard and overlay failures are only
    /// logged.
    pub async fn execute_filter(&self, query: RouteQuery) -> ClientResult<()> {
        query.validate()?;

        let token = self.sequencer.issue();
        self.state_mut().latest_query = query.clone();

        let outcome = match self.routes_backend.search(&query).await {
            Ok(routes) => {
                let count = routes.len();
                let mut state = self.state_mut();
                if state.routes.apply(token, routes, self.policy) {
                    info!(count, token = token.sequence(), "Routes refreshed");
                } else {
                    debug!(
                        token = token.sequence(),
                        applied = state.routes.applied().sequence(),
                        "Superseded route response discarded"
                    );
                }
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, token = token.sequence(), "Route search failed");
                Err(err.into())
            }
        };

        let signed_in = self.overlay.identity().is_signed_in();
        tokio::join!(self.refresh_leaderboards(), async {
            if signed_in {
                self.refresh_overlay().await;
            }
        });

        outcome
    }

    /// Re-run the latest executed query.
    pub async fn refresh_filter(&self) -> ClientResult<()> {
        let query = self.latest_query();
        self.execute_filter(query).await
    }

    /// Fetch all four leaderboards concurrently. Never fails: a failing
    /// slot keeps its last good value and records the error.
    pub async fn refresh_leaderboards(&self) {
        let backend = &self.leaderboards_backend;
        let (by_count, by_rating, week, month) = tokio::join!(
            backend.top_authors_by_route_count(),
            backend.top_authors_by_avg_rating(),
            backend.top_routes_this_week(),
            backend.top_routes_this_month(),
        );

        let now = Utc::now();
        let mut cache = self
            .leaderboards
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        cache
            .authors_by_route_count
            .record(LeaderboardKind::AuthorsByRouteCount, by_count, now);
        cache
            .authors_by_avg_rating
            .record(LeaderboardKind::AuthorsByAvgRating, by_rating, now);
        cache
            .routes_this_week
            .record(LeaderboardKind::RoutesThisWeek, week, now);
        cache
            .routes_this_month
            .record(LeaderboardKind::RoutesThisMonth, month, now);
    }

    async fn refresh_overlay(&self) {
        if let Err(err) = self.overlay.rebuild_overlay().await {
            warn!(error = %err, "Kudo overlay refresh failed");
        }
    }

    pub fn routes(&self) -> Vec<RouteSummary> {
        self.state_ref().routes.get().clone()
    }

    pub fn latest_query(&self) -> RouteQuery {
        self.state_ref().latest_query.clone()
    }

    pub fn leaderboards(&self) -> LeaderboardCache {
        self.leaderboards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn overlay(&self) -> KudoOverlay {
        self.overlay.overlay()
    }

    pub fn overlay_resolver(&self) -> &Arc<KudoOverlayResolver> {
        &self.overlay
    }

    fn state_ref(&self) -> std::sync::RwLockReadGuard<'_, QueryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> std::sync::RwLockWriteGuard<'_, QueryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for QueryStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state_ref();
        f.debug_struct("QueryStateStore")
            .field("policy", &self.policy)
            .field("latest_query", &state.latest_query)
            .field("routes", &state.routes.get().len())
            .finish()
    }
}
