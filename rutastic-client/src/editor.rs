//! Route edits and deletions made by their author.
//!
//! Same contract as every other write: the backend is the only source of
//! truth, so a successful write is followed by a re-read of the active
//! filter instead of a local patch.

use crate::error::{ClientError, ClientResult};
use crate::identity::IdentityBroadcaster;
use crate::notifications::NotificationCenter;
use crate::store::QueryStateStore;
use rutastic_core::{RouteBackend, RouteEdit, RouteId, RouteSummary, ValidationError};
use std::sync::Arc;
use tracing::{info, warn};

pub struct RouteEditor {
    routes: Arc<dyn RouteBackend>,
    identity: Arc<IdentityBroadcaster>,
    store: Arc<QueryStateStore>,
    notifications: Arc<NotificationCenter>,
}

impl RouteEditor {
    pub fn new(
        routes: Arc<dyn RouteBackend>,
        store: Arc<QueryStateStore>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        let identity = Arc::clone(store.overlay_resolver().identity());
        Self {
            routes,
            identity,
            store,
            notifications,
        }
    }

    /// Send `edit`, then re-read the route and refresh the filter.
    ///
    /// Invalid edits and signed-out callers are rejected before any call.
    /// A rejection by the backend queues an error notification; a failed
    /// refresh after an accepted edit is only a warning.
    pub async fn update_route(&self, edit: &RouteEdit) -> ClientResult<RouteSummary> {
        edit.validate()?;
        self.require_signed_in()?;

        if let Err(err) = self.routes.update_route(edit).await {
            warn!(route_id = %edit.id, error = %err, "Route edit rejected");
            self.notifications
                .error(format!("Could not save route {}: {}", edit.id, err));
            return Err(err.into());
        }
        info!(route_id = %edit.id, "Route edited");

        let (reread, refreshed) =
            tokio::join!(self.routes.route(edit.id), self.store.refresh_filter());
        if let Err(err) = refreshed {
            self.warn_stale_list(edit.id, &err);
        }
        reread.map_err(ClientError::from)
    }

    /// Delete a route, then refresh the filter so it leaves every list.
    pub async fn delete_route(&self, route_id: RouteId) -> ClientResult<()> {
        if !route_id.is_valid() {
            return Err(ValidationError::InvalidRouteId { route_id }.into());
        }
        self.require_signed_in()?;

        if let Err(err) = self.routes.delete_route(route_id).await {
            warn!(route_id = %route_id, error = %err, "Route deletion rejected");
            self.notifications
                .error(format!("Could not delete route {}: {}", route_id, err));
            return Err(err.into());
        }
        info!(route_id = %route_id, "Route deleted");

        if let Err(err) = self.store.refresh_filter().await {
            self.warn_stale_list(route_id, &err);
        }
        Ok(())
    }

    fn require_signed_in(&self) -> ClientResult<()> {
        if self.identity.is_signed_in() {
            Ok(())
        } else {
            Err(ClientError::NotSignedIn)
        }
    }

    fn warn_stale_list(&self, route_id: RouteId, err: &ClientError) {
        warn!(route_id = %route_id, error = %err, "Refresh after route write failed");
        self.notifications.warning(format!(
            "Route {} was saved but the list could not be refreshed",
            route_id
        ));
    }
}

impl std::fmt::Debug for RouteEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEditor").finish_non_exhaustive()
    }
}
