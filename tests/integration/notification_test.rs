//! Integration tests for the notification endpoints.

use http::StatusCode;
use uuid::Uuid;

use crate::helpers::TestApp;

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_list_requires_auth() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/notifications", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .request("GET", "/api/notifications", None, Some("not-a-token"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_list_is_scoped_to_caller_and_newest_first() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let other = Uuid::new_v4();
    let token = app.issue_token(user, "siti", "teacher");

    app.seed_notification(user, "grade_input", false).await;
    app.seed_notification(user, "assignment_created", false).await;
    app.seed_notification(other, "system", false).await;

    let response = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let items = response.body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(response.body["data"]["total_items"], 2);
    // Newest first: the second seed comes back before the first.
    assert_eq!(items[0]["kind"], "assignment_created");
    assert_eq!(items[1]["kind"], "grade_input");
    assert!(items.iter().all(|n| n["user_id"] == user.to_string()));
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_pagination_limits_page_size() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let token = app.issue_token(user, "siti", "teacher");

    for _ in 0..3 {
        app.seed_notification(user, "system", false).await;
    }

    let response = app
        .request(
            "GET",
            "/api/notifications?page=1&limit=2",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(response.body["data"]["total_items"], 3);
    assert_eq!(response.body["data"]["has_next"], true);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_unread_count_reflects_reads() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let token = app.issue_token(user, "siti", "teacher");

    let unread = app.seed_notification(user, "grade_input", false).await;
    app.seed_notification(user, "system", true).await;

    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["unread_count"], 1);

    let response = app
        .request(
            "PUT",
            &format!("/api/notifications/{unread}/read"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("GET", "/api/notifications/unread-count", None, Some(&token))
        .await;
    assert_eq!(response.body["data"]["unread_count"], 0);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_mark_read_is_idempotent() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let token = app.issue_token(user, "siti", "teacher");
    let id = app.seed_notification(user, "grade_input", false).await;

    for _ in 0..2 {
        let response = app
            .request(
                "PUT",
                &format!("/api/notifications/{id}/read"),
                None,
                Some(&token),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_foreign_rows_surface_as_not_found() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();
    let token = app.issue_token(intruder, "rizal", "student");
    let id = app.seed_notification(owner, "grade_input", false).await;

    let response = app
        .request(
            "PUT",
            &format!("/api/notifications/{id}/read"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request(
            "DELETE",
            &format!("/api/notifications/{id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_mark_all_read_reports_affected_count() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let token = app.issue_token(user, "siti", "teacher");

    app.seed_notification(user, "grade_input", false).await;
    app.seed_notification(user, "system", false).await;
    app.seed_notification(user, "system", true).await;

    let response = app
        .request("PUT", "/api/notifications/read-all", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["marked"], 2);

    // Second pass finds nothing left to mark.
    let response = app
        .request("PUT", "/api/notifications/read-all", None, Some(&token))
        .await;
    assert_eq!(response.body["data"]["marked"], 0);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_delete_removes_row() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let token = app.issue_token(user, "siti", "teacher");
    let id = app.seed_notification(user, "material_uploaded", false).await;

    let response = app
        .request(
            "DELETE",
            &format!("/api/notifications/{id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // Gone: a second delete is NotFound, and the list is empty.
    let response = app
        .request(
            "DELETE",
            &format!("/api/notifications/{id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    assert_eq!(response.body["data"]["total_items"], 0);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_ws_endpoint_rejects_plain_requests() {
    let app = TestApp::new().await;

    // Without a WebSocket handshake the upgrade extractor rejects the
    // request; with or without a token, nothing is upgraded.
    let response = app.request("GET", "/ws", None, None).await;
    assert!(response.status.is_client_error());

    let response = app.request("GET", "/ws?token=not-a-token", None, None).await;
    assert!(response.status.is_client_error());
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_health_needs_no_auth() {
    let app = TestApp::new().await;

    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}
