//! Tests for identity change propagation and the kudo overlay.

use rutastic_client::{IdentityBroadcaster, KudoOverlayResolver};
use rutastic_core::{BackendError, RouteId, RouteQuery, VoteDirection};
use rutastic_test_utils::assertions::assert_overlay_eq;
use rutastic_test_utils::{fixtures, MockBackend, MockOp};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[path = "support/harness.rs"]
mod harness;
use harness::Harness;

fn seeded_harness() -> Harness {
    let backend = fixtures::sample_backend();
    backend.seed_vote("ana", RouteId::new(1), VoteDirection::Up);
    backend.seed_vote("ana", RouteId::new(3), VoteDirection::Down);
    backend.seed_vote("leo", RouteId::new(2), VoteDirection::Up);
    Harness::with_backend(backend, Default::default())
}

#[tokio::test]
async fn sign_out_clears_overlay_and_notifies_each_observer_once_in_order() {
    let h = seeded_harness();
    h.sign_in_as(fixtures::ana());
    h.store
        .execute_filter(RouteQuery::all())
        .await
        .expect("execute_filter should succeed");
    assert_overlay_eq(&h.store.overlay(), &[(1, 1), (3, -1)]);

    let log = Arc::new(Mutex::new(Vec::new()));
    let handles: Vec<_> = ["first", "second", "third"]
        .into_iter()
        .map(|name| {
            let log = Arc::clone(&log);
            h.identity
                .subscribe(move || log.lock().expect("log lock").push(name))
        })
        .collect();

    h.identity
        .set_identity(None)
        .expect("set_identity should succeed");

    assert!(h.store.overlay().is_empty());
    assert_eq!(h.overlay.owner(), None);
    assert_eq!(
        *log.lock().expect("log lock"),
        vec!["first", "second", "third"]
    );
    for handle in handles {
        assert!(h.identity.unsubscribe(handle));
    }
}

#[tokio::test]
async fn rebuild_without_identity_is_empty_and_offline() {
    let h = seeded_harness();

    let overlay = h
        .overlay
        .rebuild_overlay()
        .await
        .expect("rebuild should succeed");

    assert!(overlay.is_empty());
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn switching_user_clears_overlay_synchronously() {
    let h = seeded_harness();
    h.sign_in_as(fixtures::ana());
    h.overlay
        .rebuild_overlay()
        .await
        .expect("rebuild should succeed");
    assert_eq!(h.overlay.modifier_for(RouteId::new(1)), 1);

    h.sign_in_as(fixtures::leo());
    assert!(h.overlay.overlay().is_empty());

    h.overlay
        .rebuild_overlay()
        .await
        .expect("rebuild should succeed");
    assert_overlay_eq(&h.overlay.overlay(), &[(2, 1)]);
    assert_eq!(h.overlay.owner().as_deref(), Some("leo"));
}

#[tokio::test]
async fn same_user_again_keeps_overlay() {
    let h = seeded_harness();
    h.sign_in_as(fixtures::ana());
    h.overlay
        .rebuild_overlay()
        .await
        .expect("rebuild should succeed");

    h.sign_in_as(fixtures::ana());
    assert_overlay_eq(&h.overlay.overlay(), &[(1, 1), (3, -1)]);
}

#[tokio::test(start_paused = true)]
async fn rebuild_finishing_after_identity_switch_is_discarded() {
    let h = seeded_harness();
    h.sign_in_as(fixtures::ana());
    h.backend
        .set_latency(MockOp::VotesOf, Duration::from_millis(100));

    let (rebuilt, ()) = tokio::join!(h.overlay.rebuild_overlay(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.sign_in_as(fixtures::leo());
    });

    let returned = rebuilt.expect("rebuild should succeed");
    assert!(returned.is_empty());
    assert!(h.overlay.overlay().is_empty());
    assert_eq!(h.overlay.owner(), None);
}

#[tokio::test(start_paused = true)]
async fn rebuild_finishing_after_sign_out_is_discarded() {
    let h = seeded_harness();
    h.sign_in_as(fixtures::ana());
    h.backend
        .set_latency(MockOp::VotesOf, Duration::from_millis(100));

    let (rebuilt, ()) = tokio::join!(h.overlay.rebuild_overlay(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.sign_out();
    });

    rebuilt.expect("rebuild should succeed");
    assert!(h.overlay.overlay().is_empty());
}

#[tokio::test]
async fn failed_rebuild_keeps_previous_overlay() {
    let h = seeded_harness();
    h.sign_in_as(fixtures::ana());
    h.overlay
        .rebuild_overlay()
        .await
        .expect("rebuild should succeed");

    h.backend
        .fail(MockOp::VotesOf, BackendError::transport("timeout"));
    let result = h.overlay.rebuild_overlay().await;

    assert_eq!(result, Err(BackendError::transport("timeout")));
    assert_overlay_eq(&h.overlay.overlay(), &[(1, 1), (3, -1)]);
}

#[test]
fn dropping_resolver_releases_its_subscription() {
    let identity = Arc::new(IdentityBroadcaster::new());
    let backend = Arc::new(MockBackend::new());

    let resolver = KudoOverlayResolver::new(backend, Arc::clone(&identity));
    assert_eq!(identity.observer_count(), 1);

    drop(resolver);
    assert_eq!(identity.observer_count(), 0);
    identity
        .set_identity(Some(fixtures::ana()))
        .expect("set_identity should succeed");
}
