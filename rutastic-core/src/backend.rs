//! Remote backend boundary.
//!
//! The client core talks to the backend only through these traits. The REST
//! adapter in `rutastic-client` and the in-memory mock in
//! `rutastic-test-utils` both implement them.

use crate::entities::{AuthorStat, KudoEntry, RouteEdit, RouteSummary};
use crate::enums::VoteDirection;
use crate::error::BackendResult;
use crate::filter::RouteQuery;
use crate::identity::{Identity, RouteId};
use crate::similarity::RelatedRoutesRequest;
use async_trait::async_trait;

/// Route search and route mutations.
#[async_trait]
pub trait RouteBackend: Send + Sync {
    /// Routes matching `query`, in backend order.
    async fn search(&self, query: &RouteQuery) -> BackendResult<Vec<RouteSummary>>;

    /// Routes similar to a reference route along one dimension.
    async fn related_routes(
        &self,
        request: &RelatedRoutesRequest,
    ) -> BackendResult<Vec<RouteSummary>>;

    /// A single route by id.
    async fn route(&self, route_id: RouteId) -> BackendResult<RouteSummary>;

    /// Toggle the signed-in identity's vote on a route. Only an ack comes
    /// back; the new balance must be re-read.
    async fn set_vote(&self, route_id: RouteId, direction: VoteDirection) -> BackendResult<()>;

    async fn set_blocked(&self, route_id: RouteId, blocked: bool) -> BackendResult<()>;

    /// Replace the editable fields of a route. Only its author may.
    async fn update_route(&self, edit: &RouteEdit) -> BackendResult<()>;

    /// Only the route's author may delete it.
    async fn delete_route(&self, route_id: RouteId) -> BackendResult<()>;
}

/// The four ranked lists shown next to the route list.
#[async_trait]
pub trait LeaderboardBackend: Send + Sync {
    async fn top_authors_by_route_count(&self) -> BackendResult<Vec<AuthorStat>>;

    async fn top_authors_by_avg_rating(&self) -> BackendResult<Vec<AuthorStat>>;

    async fn top_routes_this_week(&self) -> BackendResult<Vec<RouteSummary>>;

    async fn top_routes_this_month(&self) -> BackendResult<Vec<RouteSummary>>;
}

/// Vote history.
#[async_trait]
pub trait KudoBackend: Send + Sync {
    /// Every vote `username` has cast.
    async fn votes_of(&self, username: &str) -> BackendResult<Vec<KudoEntry>>;

    /// The vote `username` cast on one route, if any.
    async fn vote_of(&self, username: &str, route_id: RouteId)
        -> BackendResult<Option<KudoEntry>>;
}

/// Session management. Implementations only talk to the provider; updating
/// the client's identity slot is the caller's job.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The session restored from the provider, if one is still valid.
    async fn current_session(&self) -> BackendResult<Option<Identity>>;

    async fn sign_in(&self, username: &str, password: &str) -> BackendResult<Identity>;

    async fn sign_out(&self) -> BackendResult<()>;

    /// Delete the account of `username`, which must be the signed-in user.
    /// The session ends with it.
    async fn delete_account(&self, username: &str) -> BackendResult<()>;
}
