//! Sign-in, sign-out and session restore.
//!
//! The identity provider is only ever asked; the broadcaster slot is written
//! here, from the provider's answer. After the identity changes the filter is
//! refreshed so the overlay and "only my routes" lists follow the new user.

use crate::error::{ClientError, ClientResult};
use crate::identity::IdentityBroadcaster;
use crate::store::QueryStateStore;
use rutastic_core::{Identity, IdentityProvider, ValidationError};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SessionController {
    provider: Arc<dyn IdentityProvider>,
    identity: Arc<IdentityBroadcaster>,
    store: Arc<QueryStateStore>,
}

impl SessionController {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<QueryStateStore>) -> Self {
        let identity = Arc::clone(store.overlay_resolver().identity());
        Self {
            provider,
            identity,
            store,
        }
    }

    /// Seed the identity slot from a still-valid provider session.
    pub async fn restore(&self) -> ClientResult<Option<Identity>> {
        let session = self.provider.current_session().await?;
        if let Some(identity) = &session {
            info!(username = %identity.username, "Session restored");
        }
        self.identity.set_identity(session.clone())?;
        Ok(session)
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> ClientResult<Identity> {
        if username.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "username".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        let identity = self.provider.sign_in(username.trim(), password).await?;
        info!(username = %identity.username, "Signed in");
        self.identity.set_identity(Some(identity.clone()))?;
        self.refresh_after_change().await;
        Ok(identity)
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.provider.sign_out().await?;
        info!("Signed out");
        self.identity.set_identity(None)?;
        self.refresh_after_change().await;
        Ok(())
    }

    /// Delete the signed-in user's own account. The identity is only
    /// cleared once the provider confirms.
    pub async fn delete_account(&self) -> ClientResult<()> {
        let identity = self
            .identity
            .current_identity()
            .ok_or(ClientError::NotSignedIn)?;
        self.provider.delete_account(&identity.username).await?;
        info!(username = %identity.username, "Account deleted");
        self.identity.set_identity(None)?;
        self.refresh_after_change().await;
        Ok(())
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.current_identity()
    }

    async fn refresh_after_change(&self) {
        if let Err(err) = self.store.refresh_filter().await {
            warn!(error = %err, "Refresh after identity change failed");
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("identity", &self.identity.current_identity())
            .finish()
    }
}
