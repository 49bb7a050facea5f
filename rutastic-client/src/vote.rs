//! Vote submission.
//!
//! A vote goes `Idle -> Pending -> Applied | Failed`. The backend only acks a
//! vote, so an applied vote is reflected by re-reading: the filter is
//! refreshed (routes, leaderboards, overlay) and, for a vote cast from a
//! detail view, that route is fetched again. Balances and the overlay are
//! never adjusted locally.

use crate::error::{ClientError, ClientResult};
use crate::notifications::{Notification, NotificationAction, NotificationCenter, NotificationLevel};
use crate::store::QueryStateStore;
use rutastic_core::{RouteBackend, RouteId, RouteSummary, ValidationError, VoteDirection};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    #[default]
    Idle,
    Pending,
    Applied,
    Failed,
}

/// Where the vote was cast from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOrigin {
    /// A route list; refreshing the filter is enough.
    List,
    /// A single route's page, which also shows that route's own balance.
    Detail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteRequest {
    pub route_id: RouteId,
    pub direction: VoteDirection,
}

impl VoteRequest {
    /// Build a request from a raw direction. Anything other than `+1` or `-1`
    /// is rejected, as is an id the backend never issues.
    pub fn new(route_id: RouteId, direction: i8) -> Result<Self, ValidationError> {
        if !route_id.is_valid() {
            return Err(ValidationError::InvalidRouteId { route_id });
        }
        let direction = VoteDirection::try_from(direction)?;
        Ok(Self {
            route_id,
            direction,
        })
    }
}

/// Outcome of an acknowledged vote.
#[derive(Debug, Clone, Serialize)]
pub struct VoteReceipt {
    pub request: VoteRequest,
    /// The re-read route, for votes cast from a detail view.
    pub route: Option<RouteSummary>,
    /// Set when the vote was applied but re-reading afterwards failed.
    pub refresh_error: Option<String>,
}

impl VoteReceipt {
    pub fn is_fully_refreshed(&self) -> bool {
        self.refresh_error.is_none()
    }
}

pub struct KudoRatingConsistencyProtocol {
    routes: Arc<dyn RouteBackend>,
    store: Arc<QueryStateStore>,
    notifications: Arc<NotificationCenter>,
    state: Mutex<VoteState>,
    last_request: Mutex<Option<VoteRequest>>,
}

impl KudoRatingConsistencyProtocol {
    pub fn new(
        routes: Arc<dyn RouteBackend>,
        store: Arc<QueryStateStore>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        Self {
            routes,
            store,
            notifications,
            state: Mutex::new(VoteState::Idle),
            last_request: Mutex::new(None),
        }
    }

    pub fn state(&self) -> VoteState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_request(&self) -> Option<VoteRequest> {
        *self.last_request.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cast a vote and re-read whatever it affects.
    ///
    /// Invalid input and a missing identity are rejected without a request
    /// and without leaving the current state. A rejected vote moves to
    /// `Failed`, queues an error notification and returns the error. An
    /// acknowledged vote moves to `Applied`; if re-reading afterwards fails
    /// the vote stays applied, a warning is queued and the receipt says so.
    pub async fn submit_vote(
        &self,
        route_id: RouteId,
        direction: i8,
        origin: VoteOrigin,
    ) -> ClientResult<VoteReceipt> {
        let request = VoteRequest::new(route_id, direction)?;
        if !self.store.overlay_resolver().identity().is_signed_in() {
            return Err(ClientError::NotSignedIn);
        }

        self.transition(VoteState::Pending);
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request);

        if let Err(err) = self.routes.set_vote(request.route_id, request.direction).await {
            self.transition(VoteState::Failed);
            warn!(route_id = %request.route_id, direction = %request.direction, error = %err, "Vote rejected");
            self.notifications.push(
                Notification::new(
                    NotificationLevel::Error,
                    format!("Could not vote on route {}: {}", request.route_id, err),
                )
                .with_action(NotificationAction::Retry),
            );
            return Err(err.into());
        }

        self.transition(VoteState::Applied);
        info!(route_id = %request.route_id, direction = %request.direction, "Vote applied");

        let (refreshed, route) = match origin {
            VoteOrigin::List => (self.store.refresh_filter().await, None),
            VoteOrigin::Detail => {
                let (refreshed, route) = tokio::join!(
                    self.store.refresh_filter(),
                    self.routes.route(request.route_id)
                );
                (refreshed, Some(route))
            }
        };

        let mut errors = Vec::new();
        if let Err(err) = refreshed {
            errors.push(err.to_string());
        }
        let route = match route {
            Some(Ok(route)) => Some(route),
            Some(Err(err)) => {
                errors.push(err.to_string());
                None
            }
            None => None,
        };

        let refresh_error = if errors.is_empty() {
            None
        } else {
            let reason = errors.join("; ");
            warn!(route_id = %request.route_id, error = %reason, "Refresh after vote failed");
            self.notifications.warning(format!(
                "Your vote on route {} was saved but the view could not be refreshed",
                request.route_id
            ));
            Some(reason)
        };

        Ok(VoteReceipt {
            request,
            route,
            refresh_error,
        })
    }

    fn transition(&self, next: VoteState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl std::fmt::Debug for KudoRatingConsistencyProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KudoRatingConsistencyProtocol")
            .field("state", &self.state())
            .field("last_request", &self.last_request())
            .finish()
    }
}
