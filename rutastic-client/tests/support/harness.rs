//! Wires a full client around one in-memory backend.

#![allow(dead_code)]

use rutastic_client::{
    IdentityBroadcaster, KudoOverlayResolver, KudoRatingConsistencyProtocol, NotificationCenter,
    QueryStateStore, RouteDetailLoader, RouteEditor, SessionController, StaleResponsePolicy,
};
use rutastic_core::Identity;
use rutastic_test_utils::{fixtures, MockBackend};
use std::sync::Arc;

pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub identity: Arc<IdentityBroadcaster>,
    pub overlay: Arc<KudoOverlayResolver>,
    pub store: Arc<QueryStateStore>,
    pub notifications: Arc<NotificationCenter>,
    pub votes: KudoRatingConsistencyProtocol,
    pub session: SessionController,
    pub details: RouteDetailLoader,
    pub editor: RouteEditor,
}

impl Harness {
    /// Sample catalog, default stale-response policy, nobody signed in.
    pub fn new() -> Self {
        Self::with_backend(fixtures::sample_backend(), StaleResponsePolicy::default())
    }

    pub fn with_policy(policy: StaleResponsePolicy) -> Self {
        Self::with_backend(fixtures::sample_backend(), policy)
    }

    pub fn with_backend(backend: MockBackend, policy: StaleResponsePolicy) -> Self {
        let backend = Arc::new(backend);
        let identity = Arc::new(IdentityBroadcaster::new());
        let overlay = Arc::new(KudoOverlayResolver::new(
            backend.clone(),
            Arc::clone(&identity),
        ));
        let store = Arc::new(
            QueryStateStore::new(backend.clone(), backend.clone(), Arc::clone(&overlay))
                .with_policy(policy),
        );
        let notifications = Arc::new(NotificationCenter::new());
        let votes = KudoRatingConsistencyProtocol::new(
            backend.clone(),
            Arc::clone(&store),
            Arc::clone(&notifications),
        );
        let session = SessionController::new(backend.clone(), Arc::clone(&store));
        let details = RouteDetailLoader::new(
            backend.clone(),
            backend.clone(),
            Arc::clone(&store),
            Arc::clone(&notifications),
        );
        let editor = RouteEditor::new(
            backend.clone(),
            Arc::clone(&store),
            Arc::clone(&notifications),
        );
        Self {
            backend,
            identity,
            overlay,
            store,
            notifications,
            votes,
            session,
            details,
            editor,
        }
    }

    /// Put `identity` in both the backend session and the client slot.
    pub fn sign_in_as(&self, identity: Identity) {
        self.backend.set_session(Some(identity.clone()));
        self.identity
            .set_identity(Some(identity))
            .expect("set_identity should succeed");
    }

    pub fn sign_out(&self) {
        self.backend.set_session(None);
        self.identity
            .set_identity(None)
            .expect("set_identity should succeed");
    }
}
