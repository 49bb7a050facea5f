//! Tests for editing and deleting routes.

use rutastic_client::{ClientError, NotificationLevel};
use rutastic_core::{BackendError, RouteEdit, RouteId, RouteQuery, ValidationError};
use rutastic_test_utils::{fixtures, MockOp};

#[path = "support/harness.rs"]
mod harness;
use harness::Harness;

fn edit_of(h: &Harness, route_id: i64) -> RouteEdit {
    let route = h
        .backend
        .route_snapshot(RouteId::new(route_id))
        .expect("route exists");
    RouteEdit::from_route(&route, "Marked trail with two climbs")
}

async fn signed_in_with_all_routes(identity: rutastic_core::Identity) -> Harness {
    let h = Harness::new();
    h.sign_in_as(identity);
    h.store
        .execute_filter(RouteQuery::all())
        .await
        .expect("execute_filter should succeed");
    h.backend.reset_calls();
    h
}

// === Edit ===

#[tokio::test]
async fn accepted_edit_refreshes_the_list() {
    let h = signed_in_with_all_routes(fixtures::ana()).await;
    let mut edit = edit_of(&h, 1);
    edit.title = "Ridge loop extended".to_string();
    edit.distance = 2_600;

    let updated = h
        .editor
        .update_route(&edit)
        .await
        .expect("update_route should succeed");

    assert_eq!(updated.title, "Ridge loop extended");
    assert_eq!(updated.kudos, 3);
    let listed = h
        .store
        .routes()
        .into_iter()
        .find(|r| r.id == RouteId::new(1))
        .expect("route 1 still listed");
    assert_eq!(listed.title, "Ridge loop extended");
    assert_eq!(listed.distance, 2_600);
    assert_eq!(h.backend.call_count(MockOp::UpdateRoute), 1);
    assert_eq!(h.backend.call_count(MockOp::Search), 1);
    assert!(h.notifications.is_empty());
}

#[tokio::test]
async fn edit_by_someone_else_is_rejected_and_notified() {
    let h = signed_in_with_all_routes(fixtures::ana()).await;
    let mut edit = edit_of(&h, 2);
    edit.title = "Mine now".to_string();

    let result = h.editor.update_route(&edit).await;

    assert!(matches!(
        result,
        Err(ClientError::Backend(BackendError::Unauthenticated))
    ));
    assert_eq!(h.backend.call_count(MockOp::Search), 0);
    assert_eq!(
        h.backend.route_snapshot(RouteId::new(2)).map(|r| r.title),
        Some("Lago azul".to_string())
    );
    let notifications = h.notifications.drain();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Error);
}

#[tokio::test]
async fn invalid_edit_makes_no_calls() {
    let h = signed_in_with_all_routes(fixtures::ana()).await;
    let mut edit = edit_of(&h, 1);
    edit.title = "   ".to_string();

    let result = h.editor.update_route(&edit).await;

    assert!(matches!(
        result,
        Err(ClientError::Validation(ValidationError::InvalidValue { .. }))
    ));
    assert!(h.backend.calls().is_empty());
    assert!(h.notifications.is_empty());
}

#[tokio::test]
async fn edit_while_signed_out_makes_no_calls() {
    let h = Harness::new();
    let edit = edit_of(&h, 1);

    let result = h.editor.update_route(&edit).await;

    assert!(matches!(result, Err(ClientError::NotSignedIn)));
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn edit_with_failed_refresh_only_warns() {
    let h = signed_in_with_all_routes(fixtures::ana()).await;
    h.backend
        .fail(MockOp::Search, BackendError::transport("reset"));
    let mut edit = edit_of(&h, 3);
    edit.duration = 400;

    let updated = h
        .editor
        .update_route(&edit)
        .await
        .expect("the edit itself succeeded");

    assert_eq!(updated.duration, 400);
    let notifications = h.notifications.drain();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Warning);
}

// === Delete ===

#[tokio::test]
async fn deleted_route_leaves_the_list() {
    let h = signed_in_with_all_routes(fixtures::ana()).await;
    assert!(h.store.routes().iter().any(|r| r.id == RouteId::new(3)));

    h.editor
        .delete_route(RouteId::new(3))
        .await
        .expect("delete_route should succeed");

    assert!(h.store.routes().iter().all(|r| r.id != RouteId::new(3)));
    assert_eq!(h.store.routes().len(), 5);
    assert_eq!(h.backend.call_count(MockOp::DeleteRoute), 1);
    assert_eq!(h.backend.call_count(MockOp::Search), 1);
    assert!(h.notifications.is_empty());
}

#[tokio::test]
async fn deleting_a_missing_route_is_notified() {
    let h = signed_in_with_all_routes(fixtures::ana()).await;

    let result = h.editor.delete_route(RouteId::new(99)).await;

    assert!(matches!(
        result,
        Err(ClientError::Backend(BackendError::RouteNotFound { .. }))
    ));
    assert_eq!(h.backend.call_count(MockOp::Search), 0);
    let notifications = h.notifications.drain();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Error);
}

#[tokio::test]
async fn deleting_someone_elses_route_keeps_it() {
    let h = signed_in_with_all_routes(fixtures::leo()).await;

    let result = h.editor.delete_route(RouteId::new(1)).await;

    assert!(matches!(
        result,
        Err(ClientError::Backend(BackendError::Unauthenticated))
    ));
    assert!(h.backend.route_snapshot(RouteId::new(1)).is_some());
    assert_eq!(h.store.routes().len(), 6);
}

#[tokio::test]
async fn invalid_route_id_is_rejected_locally() {
    let h = signed_in_with_all_routes(fixtures::ana()).await;

    let result = h.editor.delete_route(RouteId::new(0)).await;

    assert!(matches!(
        result,
        Err(ClientError::Validation(ValidationError::InvalidRouteId { .. }))
    ));
    assert!(h.backend.calls().is_empty());
}
