//! Integration tests for the insert-to-feed delivery chain:
//! `NotificationService::create` → transactional NOTIFY → `PgFeedBridge`
//! → `FeedHub` subscription.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use tokio::sync::watch;
use uuid::Uuid;

use campus_entity::notification::{NewNotification, NotificationKind};
use campus_feed::pg_bridge::PgFeedBridge;
use campus_feed::source::FeedSource;

use crate::helpers::TestApp;

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_create_is_delivered_to_owner_subscription() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let bystander = Uuid::new_v4();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let bridge = PgFeedBridge::new(
        app.db_pool.clone(),
        Arc::clone(&app.feed),
        app.config.feed.clone(),
    );
    let bridge_handle = bridge.spawn(shutdown_rx);

    let mut owner_sub = app.feed.subscribe(owner).await;
    let mut bystander_sub = app.feed.subscribe(bystander).await;

    // Give the listener a moment to attach before the insert commits.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let created = app
        .notification_service
        .create(
            NewNotification::new(
                owner,
                NotificationKind::GradeInput,
                "Grade entered",
                "Mathematics: 88",
            )
            .with_reference(Uuid::new_v4()),
        )
        .await
        .expect("Failed to create notification");

    let event = tokio::time::timeout(Duration::from_secs(5), owner_sub.recv())
        .await
        .expect("No feed event arrived within timeout")
        .expect("Subscription closed before delivery");
    assert_eq!(event.id, created.id);
    assert_eq!(event.user_id, owner);
    assert_eq!(event.kind, NotificationKind::GradeInput);
    assert!(event.is_unread());

    // The event arrived, so the committed row is visible to polling reads.
    let token = app.issue_token(owner, "siti", "teacher");
    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["unread_count"], 1);

    // The bystander's stream stays silent.
    let silent = tokio::time::timeout(Duration::from_millis(300), bystander_sub.recv()).await;
    assert!(silent.is_err(), "Feed event leaked to another user");

    let _ = shutdown_tx.send(true);
    let _ = tokio::time::timeout(Duration::from_secs(5), bridge_handle).await;
}
