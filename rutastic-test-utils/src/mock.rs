//! In-memory backend implementing every backend trait.
//!
//! Keeps routes, votes and one session in memory and applies the same
//! rules as the real service: votes toggle, balances move with them, and
//! the leaderboards are derived from current balances. Every call is logged
//! and any operation can be made to fail or to take time.

use async_trait::async_trait;
use chrono::Utc;
use rutastic_core::{
    AuthorStat, BackendError, BackendResult, Identity, IdentityProvider, KudoBackend, KudoEntry,
    KudoOrdering, LeaderboardBackend, RelatedRoutesRequest, RouteBackend, RouteEdit, RouteId,
    RouteQuery, RouteSummary, Similarity, VoteDirection,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How many entries each derived leaderboard keeps.
pub const LEADERBOARD_SIZE: usize = 5;

/// Backend operations, for failure injection, latency and the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Search,
    RelatedRoutes,
    Route,
    SetVote,
    SetBlocked,
    UpdateRoute,
    DeleteRoute,
    TopAuthorsByRouteCount,
    TopAuthorsByAvgRating,
    TopRoutesThisWeek,
    TopRoutesThisMonth,
    VotesOf,
    VoteOf,
    CurrentSession,
    SignIn,
    SignOut,
    DeleteAccount,
}

impl MockOp {
    pub const LEADERBOARDS: [MockOp; 4] = [
        MockOp::TopAuthorsByRouteCount,
        MockOp::TopAuthorsByAvgRating,
        MockOp::TopRoutesThisWeek,
        MockOp::TopRoutesThisMonth,
    ];
}

#[derive(Debug, Clone)]
enum Failure {
    Always(BackendError),
    Once(BackendError),
}

#[derive(Debug, Default)]
struct MockState {
    routes: BTreeMap<RouteId, RouteSummary>,
    /// Keyed by (username, route).
    votes: BTreeMap<(String, RouteId), KudoEntry>,
    users: HashMap<String, (String, Identity)>,
    session: Option<Identity>,
    failures: HashMap<MockOp, Failure>,
    latency: HashMap<MockOp, Duration>,
    search_delays: VecDeque<Duration>,
    calls: Vec<MockOp>,
    searches: Vec<RouteQuery>,
}

#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routes<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = RouteSummary>,
    {
        let backend = Self::new();
        for route in routes {
            backend.insert_route(route);
        }
        backend
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === Seeding ===

    pub fn insert_route(&self, route: RouteSummary) {
        self.state().routes.insert(route.id, route);
    }

    /// Register an account that `sign_in` accepts.
    pub fn register_user(&self, identity: Identity, password: impl Into<String>) {
        self.state()
            .users
            .insert(identity.username.clone(), (password.into(), identity));
    }

    /// Put a session in place without going through `sign_in`.
    pub fn set_session(&self, identity: Option<Identity>) {
        self.state().session = identity;
    }

    /// Record a vote directly, adjusting the route balance.
    pub fn seed_vote(&self, username: &str, route_id: RouteId, direction: VoteDirection) {
        let mut state = self.state();
        apply_vote(&mut state, username, route_id, direction);
    }

    // === Fault injection ===

    /// Make `op` fail with `error` until [`MockBackend::clear_failure`].
    pub fn fail(&self, op: MockOp, error: BackendError) {
        self.state().failures.insert(op, Failure::Always(error));
    }

    /// Make only the next call of `op` fail.
    pub fn fail_once(&self, op: MockOp, error: BackendError) {
        self.state().failures.insert(op, Failure::Once(error));
    }

    pub fn clear_failure(&self, op: MockOp) {
        self.state().failures.remove(&op);
    }

    /// Delay every call of `op` by `delay` before it answers.
    pub fn set_latency(&self, op: MockOp, delay: Duration) {
        self.state().latency.insert(op, delay);
    }

    /// Queue an extra delay for the next search call. Queued delays are
    /// consumed in call order, which lets a test make an earlier search
    /// finish after a later one.
    pub fn push_search_delay(&self, delay: Duration) {
        self.state().search_delays.push_back(delay);
    }

    // === Inspection ===

    pub fn calls(&self) -> Vec<MockOp> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, op: MockOp) -> usize {
        self.state().calls.iter().filter(|c| **c == op).count()
    }

    pub fn reset_calls(&self) {
        let mut state = self.state();
        state.calls.clear();
        state.searches.clear();
    }

    /// Queries received by `search`, in call order.
    pub fn searches(&self) -> Vec<RouteQuery> {
        self.state().searches.clone()
    }

    pub fn route_snapshot(&self, route_id: RouteId) -> Option<RouteSummary> {
        self.state().routes.get(&route_id).cloned()
    }

    pub fn session(&self) -> Option<Identity> {
        self.state().session.clone()
    }

    pub fn has_user(&self, username: &str) -> bool {
        self.state().users.contains_key(username)
    }

    /// Votes currently recorded for `route_id`, across all users.
    pub fn votes_on(&self, route_id: RouteId) -> usize {
        self.state()
            .votes
            .keys()
            .filter(|(_, voted)| *voted == route_id)
            .count()
    }

    /// What `search` would return right now, without logging a call.
    pub fn expected_search(&self, query: &RouteQuery) -> Vec<RouteSummary> {
        let state = self.state();
        run_search(&state, query)
    }

    /// Log the call, wait out any latency, then surface an injected failure.
    async fn enter(&self, op: MockOp) -> BackendResult<()> {
        let delay = {
            let mut state = self.state();
            state.calls.push(op);
            let mut delay = state.latency.get(&op).copied().unwrap_or_default();
            if op == MockOp::Search {
                delay += state.search_delays.pop_front().unwrap_or_default();
            }
            delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        match state.failures.get(&op).cloned() {
            Some(Failure::Always(err)) => Err(err),
            Some(Failure::Once(err)) => {
                state.failures.remove(&op);
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn require_session(state: &MockState) -> BackendResult<Identity> {
        state.session.clone().ok_or(BackendError::Unauthenticated)
    }

    /// Only the author may change or remove a route.
    fn require_author(state: &MockState, route_id: RouteId) -> BackendResult<()> {
        let identity = Self::require_session(state)?;
        let route = state
            .routes
            .get(&route_id)
            .ok_or(BackendError::RouteNotFound { route_id })?;
        if route.author != identity.username {
            return Err(BackendError::Unauthenticated);
        }
        Ok(())
    }
}

#[async_trait]
impl RouteBackend for MockBackend {
    async fn search(&self, query: &RouteQuery) -> BackendResult<Vec<RouteSummary>> {
        self.state().searches.push(query.clone());
        self.enter(MockOp::Search).await?;
        let state = self.state();
        Ok(run_search(&state, query))
    }

    async fn related_routes(
        &self,
        request: &RelatedRoutesRequest,
    ) -> BackendResult<Vec<RouteSummary>> {
        self.enter(MockOp::RelatedRoutes).await?;
        let state = self.state();
        let reference = state
            .routes
            .get(&request.route_id)
            .cloned()
            .ok_or(BackendError::RouteNotFound {
                route_id: request.route_id,
            })?;

        let related = state
            .routes
            .values()
            .filter(|route| route.id != reference.id && !route.blocked)
            .filter(|route| match request.similarity {
                Similarity::Distance => {
                    let delta = request.distance_delta.unwrap_or(0);
                    route.distance.abs_diff(reference.distance) <= delta
                }
                Similarity::SkillLevel => route.difficulty == reference.difficulty,
                Similarity::Categories => !route.categories.is_disjoint(&reference.categories),
            })
            .take(request.limit.map_or(usize::MAX, |l| l as usize))
            .cloned()
            .collect();
        Ok(related)
    }

    async fn route(&self, route_id: RouteId) -> BackendResult<RouteSummary> {
        self.enter(MockOp::Route).await?;
        self.state()
            .routes
            .get(&route_id)
            .cloned()
            .ok_or(BackendError::RouteNotFound { route_id })
    }

    async fn set_vote(&self, route_id: RouteId, direction: VoteDirection) -> BackendResult<()> {
        self.enter(MockOp::SetVote).await?;
        let mut state = self.state();
        let identity = Self::require_session(&state)?;
        if !state.routes.contains_key(&route_id) {
            return Err(BackendError::RouteNotFound { route_id });
        }
        apply_vote(&mut state, &identity.username, route_id, direction);
        Ok(())
    }

    async fn set_blocked(&self, route_id: RouteId, blocked: bool) -> BackendResult<()> {
        self.enter(MockOp::SetBlocked).await?;
        let mut state = self.state();
        Self::require_session(&state)?;
        let route = state
            .routes
            .get_mut(&route_id)
            .ok_or(BackendError::RouteNotFound { route_id })?;
        route.blocked = blocked;
        Ok(())
    }

    async fn update_route(&self, edit: &RouteEdit) -> BackendResult<()> {
        self.enter(MockOp::UpdateRoute).await?;
        let mut state = self.state();
        Self::require_author(&state, edit.id)?;
        if let Some(route) = state.routes.get_mut(&edit.id) {
            edit.apply_to(route);
        }
        Ok(())
    }

    async fn delete_route(&self, route_id: RouteId) -> BackendResult<()> {
        self.enter(MockOp::DeleteRoute).await?;
        let mut state = self.state();
        Self::require_author(&state, route_id)?;
        state.routes.remove(&route_id);
        state.votes.retain(|(_, voted), _| *voted != route_id);
        Ok(())
    }
}

#[async_trait]
impl LeaderboardBackend for MockBackend {
    async fn top_authors_by_route_count(&self) -> BackendResult<Vec<AuthorStat>> {
        self.enter(MockOp::TopAuthorsByRouteCount).await?;
        let state = self.state();
        let mut counts: BTreeMap<String, f32> = BTreeMap::new();
        for route in top_routes(&state) {
            *counts.entry(route.author).or_default() += 1.0;
        }
        Ok(rank_authors(counts))
    }

    async fn top_authors_by_avg_rating(&self) -> BackendResult<Vec<AuthorStat>> {
        self.enter(MockOp::TopAuthorsByAvgRating).await?;
        let state = self.state();
        let mut totals: BTreeMap<String, (i64, u32)> = BTreeMap::new();
        let voted: std::collections::BTreeSet<RouteId> =
            state.votes.keys().map(|(_, route_id)| *route_id).collect();
        for route in state.routes.values().filter(|r| voted.contains(&r.id)) {
            let entry = totals.entry(route.author.clone()).or_default();
            entry.0 += route.kudos;
            entry.1 += 1;
        }
        let averages = totals
            .into_iter()
            .map(|(author, (sum, count))| (author, sum as f32 / count as f32))
            .collect();
        Ok(rank_authors(averages))
    }

    async fn top_routes_this_week(&self) -> BackendResult<Vec<RouteSummary>> {
        self.enter(MockOp::TopRoutesThisWeek).await?;
        Ok(top_routes(&self.state()))
    }

    async fn top_routes_this_month(&self) -> BackendResult<Vec<RouteSummary>> {
        self.enter(MockOp::TopRoutesThisMonth).await?;
        Ok(top_routes(&self.state()))
    }
}

#[async_trait]
impl KudoBackend for MockBackend {
    async fn votes_of(&self, username: &str) -> BackendResult<Vec<KudoEntry>> {
        self.enter(MockOp::VotesOf).await?;
        Ok(self
            .state()
            .votes
            .iter()
            .filter(|((voter, _), _)| voter == username)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn vote_of(
        &self,
        username: &str,
        route_id: RouteId,
    ) -> BackendResult<Option<KudoEntry>> {
        self.enter(MockOp::VoteOf).await?;
        Ok(self
            .state()
            .votes
            .get(&(username.to_string(), route_id))
            .cloned())
    }
}

#[async_trait]
impl IdentityProvider for MockBackend {
    async fn current_session(&self) -> BackendResult<Option<Identity>> {
        self.enter(MockOp::CurrentSession).await?;
        Ok(self.state().session.clone())
    }

    async fn sign_in(&self, username: &str, password: &str) -> BackendResult<Identity> {
        self.enter(MockOp::SignIn).await?;
        let mut state = self.state();
        let identity = match state.users.get(username) {
            Some((expected, identity)) if expected == password => identity.clone(),
            _ => return Err(BackendError::Unauthenticated),
        };
        state.session = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.enter(MockOp::SignOut).await?;
        self.state().session = None;
        Ok(())
    }

    async fn delete_account(&self, username: &str) -> BackendResult<()> {
        self.enter(MockOp::DeleteAccount).await?;
        let mut state = self.state();
        let identity = Self::require_session(&state)?;
        if identity.username != username {
            return Err(BackendError::Unauthenticated);
        }
        state.users.remove(username);
        state.votes.retain(|(voter, _), _| voter != username);
        state.session = None;
        Ok(())
    }
}

/// Toggle semantics: repeating a direction retracts the vote, the opposite
/// direction switches it.
fn apply_vote(state: &mut MockState, username: &str, route_id: RouteId, direction: VoteDirection) {
    let key = (username.to_string(), route_id);
    let step = i64::from(direction.as_i8());
    let balance_change = match state.votes.get(&key).map(|e| e.modifier) {
        Some(existing) if existing == direction.as_i8() => {
            state.votes.remove(&key);
            -step
        }
        Some(_) => {
            state.votes.insert(key, entry(username, route_id, direction));
            2 * step
        }
        None => {
            state.votes.insert(key, entry(username, route_id, direction));
            step
        }
    };
    if let Some(route) = state.routes.get_mut(&route_id) {
        route.kudos += balance_change;
    }
}

fn entry(username: &str, route_id: RouteId, direction: VoteDirection) -> KudoEntry {
    KudoEntry {
        username: username.to_string(),
        route_id,
        modifier: direction.as_i8(),
        submitted_at: Some(Utc::now()),
    }
}

fn run_search(state: &MockState, query: &RouteQuery) -> Vec<RouteSummary> {
    let terms: Vec<String> = query
        .search_terms()
        .into_iter()
        .map(|t| t.to_lowercase())
        .collect();
    let author = query.author_filter();
    let me = state.session.as_ref().map(|i| i.username.as_str());

    let mut routes: Vec<RouteSummary> = state
        .routes
        .values()
        .filter(|route| {
            let title = route.title.to_lowercase();
            terms.is_empty() || terms.iter().any(|term| title.contains(term.as_str()))
        })
        .filter(|route| author.map_or(true, |a| route.author == a))
        .filter(|route| query.categories.is_subset(&route.categories))
        .filter(|route| query.distance.contains(route.distance))
        .filter(|route| query.duration.contains(route.duration))
        .filter(|route| query.difficulty.map_or(true, |d| route.difficulty == d))
        .filter(|route| query.min_kudos.map_or(true, |min| route.kudos >= min))
        .filter(|route| !(query.hide_blocked && route.blocked))
        .filter(|route| !query.only_mine || me == Some(route.author.as_str()))
        .cloned()
        .collect();

    match query.ordering {
        KudoOrdering::Unordered => {}
        KudoOrdering::Ascending => routes.sort_by_key(|r| r.kudos),
        KudoOrdering::Descending => routes.sort_by_key(|r| std::cmp::Reverse(r.kudos)),
    }
    routes
}

/// Positive-balance, unblocked routes by descending balance.
fn top_routes(state: &MockState) -> Vec<RouteSummary> {
    let mut routes: Vec<RouteSummary> = state
        .routes
        .values()
        .filter(|r| r.kudos > 0 && !r.blocked)
        .cloned()
        .collect();
    routes.sort_by_key(|r| std::cmp::Reverse(r.kudos));
    routes.truncate(LEADERBOARD_SIZE);
    routes
}

fn rank_authors(stats: BTreeMap<String, f32>) -> Vec<AuthorStat> {
    let mut ranked: Vec<AuthorStat> = stats
        .into_iter()
        .map(|(username, stat)| AuthorStat { username, stat })
        .collect();
    ranked.sort_by(|a, b| b.stat.total_cmp(&a.stat));
    ranked.truncate(LEADERBOARD_SIZE);
    ranked
}
