//! The signed-in user's own votes, keyed by route.
//!
//! The overlay is rebuilt wholesale from the vote history and never patched.
//! It belongs to one user: switching or dropping the identity clears it on
//! the spot, and a rebuild that finishes after such a switch is discarded.

use crate::identity::{IdentityBroadcaster, SubscriptionHandle};
use crate::sequencer::{RequestSequencer, Sequenced, StaleResponsePolicy};
use rutastic_core::{BackendResult, KudoBackend, KudoOverlay, RouteId};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct OverlaySlot {
    overlay: Sequenced<KudoOverlay>,
    /// Username the held overlay was built for.
    owner: Option<String>,
}

#[derive(Debug, Default)]
struct Shared {
    sequencer: RequestSequencer,
    slot: Mutex<OverlaySlot>,
}

impl Shared {
    fn slot(&self) -> std::sync::MutexGuard<'_, OverlaySlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the held overlay unless it already belongs to `username`.
    fn clear_unless_owned_by(&self, username: Option<&str>) {
        let mut slot = self.slot();
        if username.is_some() && slot.owner.as_deref() == username {
            return;
        }
        let token = self.sequencer.issue();
        slot.overlay.reset(KudoOverlay::empty(), token);
        slot.owner = None;
    }
}

pub struct KudoOverlayResolver {
    kudos: Arc<dyn KudoBackend>,
    identity: Arc<IdentityBroadcaster>,
    shared: Arc<Shared>,
    subscription: SubscriptionHandle,
}

impl KudoOverlayResolver {
    pub fn new(kudos: Arc<dyn KudoBackend>, identity: Arc<IdentityBroadcaster>) -> Self {
        let shared = Arc::new(Shared::default());
        let subscription = {
            let shared = Arc::downgrade(&shared);
            let broadcaster = Arc::downgrade(&identity);
            identity.subscribe(move || {
                let (Some(shared), Some(broadcaster)) = (shared.upgrade(), broadcaster.upgrade())
                else {
                    return;
                };
                let current = broadcaster.current_identity();
                shared.clear_unless_owned_by(current.as_ref().map(|i| i.username.as_str()));
            })
        };
        Self {
            kudos,
            identity,
            shared,
            subscription,
        }
    }

    /// Re-read the current identity's vote history and replace the overlay.
    ///
    /// Without an identity this clears the overlay and resolves to an empty
    /// mapping without touching the backend. On failure the held overlay is
    /// left as it was.
    pub async fn rebuild_overlay(&self) -> BackendResult<KudoOverlay> {
        let Some(identity) = self.identity.current_identity() else {
            self.shared.clear_unless_owned_by(None);
            return Ok(KudoOverlay::empty());
        };

        let token = self.shared.sequencer.issue();
        let entries = self.kudos.votes_of(&identity.username).await?;
        let fetched = KudoOverlay::from_entries(&entries);

        let still_current = self
            .identity
            .current_identity()
            .is_some_and(|current| current.same_user(&identity));
        if !still_current {
            debug!(username = %identity.username, "Identity changed during overlay rebuild, discarding");
            return Ok(self.overlay());
        }

        let mut slot = self.shared.slot();
        if slot
            .overlay
            .apply(token, fetched, StaleResponsePolicy::DiscardSuperseded)
        {
            slot.owner = Some(identity.username.clone());
            debug!(
                username = %identity.username,
                count = slot.overlay.get().len(),
                "Kudo overlay rebuilt"
            );
        } else {
            debug!(username = %identity.username, "Superseded overlay rebuild discarded");
        }
        Ok(slot.overlay.get().clone())
    }

    pub fn overlay(&self) -> KudoOverlay {
        self.shared.slot().overlay.get().clone()
    }

    /// The held modifier for one route, 0 when the user never voted on it.
    pub fn modifier_for(&self, route_id: RouteId) -> i8 {
        self.shared.slot().overlay.get().modifier_for(route_id)
    }

    /// Username the held overlay belongs to, if any.
    pub fn owner(&self) -> Option<String> {
        self.shared.slot().owner.clone()
    }

    pub fn identity(&self) -> &Arc<IdentityBroadcaster> {
        &self.identity
    }
}

impl Drop for KudoOverlayResolver {
    fn drop(&mut self) {
        self.identity.unsubscribe(self.subscription);
    }
}

impl std::fmt::Debug for KudoOverlayResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KudoOverlayResolver")
            .field("owner", &self.owner())
            .field("entries", &self.overlay().len())
            .finish()
    }
}
