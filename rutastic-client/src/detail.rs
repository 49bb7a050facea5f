//! Single-route page: the route, the viewer's own vote on it, and routes
//! similar to it.

use crate::error::{ClientError, ClientResult};
use crate::identity::IdentityBroadcaster;
use crate::notifications::NotificationCenter;
use crate::store::QueryStateStore;
use rutastic_core::{
    BackendResult, KudoBackend, RelatedRoutesRequest, RouteBackend, RouteId, RouteSummary,
    Similarity, ValidationError,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Related-route collections requested per similarity dimension unless
/// configured otherwise.
pub const DEFAULT_RELATED_LIMIT: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDetail {
    pub route: RouteSummary,
    /// The viewer's own modifier on this route; 0 when signed out or never voted.
    pub own_vote: i8,
    pub related_by_distance: Vec<RouteSummary>,
    pub related_by_skill_level: Vec<RouteSummary>,
    pub related_by_categories: Vec<RouteSummary>,
}

impl RouteDetail {
    pub fn related(&self, similarity: Similarity) -> &[RouteSummary] {
        match similarity {
            Similarity::Distance => &self.related_by_distance,
            Similarity::SkillLevel => &self.related_by_skill_level,
            Similarity::Categories => &self.related_by_categories,
        }
    }
}

pub struct RouteDetailLoader {
    routes: Arc<dyn RouteBackend>,
    kudos: Arc<dyn KudoBackend>,
    identity: Arc<IdentityBroadcaster>,
    store: Arc<QueryStateStore>,
    notifications: Arc<NotificationCenter>,
    related_limit: u32,
}

impl RouteDetailLoader {
    pub fn new(
        routes: Arc<dyn RouteBackend>,
        kudos: Arc<dyn KudoBackend>,
        store: Arc<QueryStateStore>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        let identity = Arc::clone(store.overlay_resolver().identity());
        Self {
            routes,
            kudos,
            identity,
            store,
            notifications,
            related_limit: DEFAULT_RELATED_LIMIT,
        }
    }

    pub fn with_related_limit(mut self, limit: u32) -> Self {
        self.related_limit = limit;
        self
    }

    /// Load a route and everything its page shows.
    ///
    /// Only the route itself is required. The own vote and the related
    /// collections are fetched concurrently once the route is known; any of
    /// them failing is logged and leaves that part empty.
    pub async fn load(&self, route_id: RouteId) -> ClientResult<RouteDetail> {
        if !route_id.is_valid() {
            return Err(ValidationError::InvalidRouteId { route_id }.into());
        }
        let route = self.routes.route(route_id).await?;

        let (own_vote, by_distance, by_skill_level, by_categories) = tokio::join!(
            self.own_vote(route_id),
            self.related(&route, Similarity::Distance),
            self.related(&route, Similarity::SkillLevel),
            self.related(&route, Similarity::Categories),
        );

        Ok(RouteDetail {
            route,
            own_vote,
            related_by_distance: by_distance,
            related_by_skill_level: by_skill_level,
            related_by_categories: by_categories,
        })
    }

    /// Flip the blocked flag of `route`, then re-read the route and refresh
    /// the filter so every list reflects it.
    ///
    /// A rejected toggle queues an error notification. A failed filter
    /// refresh after a successful toggle is only a warning.
    pub async fn toggle_blocked(&self, route: &RouteSummary) -> ClientResult<RouteSummary> {
        let blocked = !route.blocked;
        if let Err(err) = self.routes.set_blocked(route.id, blocked).await {
            warn!(route_id = %route.id, blocked, error = %err, "Block toggle rejected");
            self.notifications
                .error(format!("Could not change route {}: {}", route.id, err));
            return Err(err.into());
        }

        let (reread, refreshed) =
            tokio::join!(self.routes.route(route.id), self.store.refresh_filter());
        if let Err(err) = refreshed {
            warn!(route_id = %route.id, error = %err, "Refresh after block toggle failed");
            self.notifications.warning(format!(
                "Route {} was updated but the list could not be refreshed",
                route.id
            ));
        }
        reread.map_err(ClientError::from)
    }

    async fn own_vote(&self, route_id: RouteId) -> i8 {
        let Some(identity) = self.identity.current_identity() else {
            return 0;
        };
        match self.kudos.vote_of(&identity.username, route_id).await {
            Ok(entry) => entry.map_or(0, |e| e.modifier.clamp(-1, 1)),
            Err(err) => {
                warn!(route_id = %route_id, error = %err, "Own vote lookup failed");
                0
            }
        }
    }

    async fn related(&self, route: &RouteSummary, similarity: Similarity) -> Vec<RouteSummary> {
        let request = RelatedRoutesRequest::for_route(route, similarity, self.related_limit);
        let outcome: BackendResult<Vec<RouteSummary>> = self.routes.related_routes(&request).await;
        match outcome {
            Ok(routes) => {
                debug!(route_id = %route.id, similarity = %similarity, count = routes.len(), "Related routes loaded");
                routes
            }
            Err(err) => {
                warn!(route_id = %route.id, similarity = %similarity, error = %err, "Related routes fetch failed");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for RouteDetailLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDetailLoader")
            .field("related_limit", &self.related_limit)
            .finish()
    }
}
