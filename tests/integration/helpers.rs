//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use campus_api::auth::{Claims, JwtValidator};
use campus_api::state::AppState;
use campus_core::config::AppConfig;
use campus_database::repositories::notification::NotificationRepository;
use campus_feed::hub::FeedHub;
use campus_service::notification::NotificationService;

/// Test application context.
pub struct TestApp {
    /// The Axum router for making test requests.
    pub router: Router,
    /// Database pool for direct queries.
    pub db_pool: PgPool,
    /// Application config.
    pub config: AppConfig,
    /// Feed hub, for asserting on subscriptions.
    pub feed: Arc<FeedHub>,
    /// Notification service, for exercising the create path directly.
    pub notification_service: Arc<NotificationService>,
}

impl TestApp {
    /// Create a new test application.
    pub async fn new() -> Self {
        let config = AppConfig::load("test").expect("Failed to load test config");

        let db_pool = campus_database::connection::create_pool(&config.database)
            .await
            .expect("Failed to connect to test database");

        campus_database::migration::run_migrations(&db_pool)
            .await
            .expect("Failed to run migrations");

        Self::clean_database(&db_pool).await;

        let notification_repo = Arc::new(NotificationRepository::new(
            db_pool.clone(),
            config.feed.channel.clone(),
        ));
        let notification_service =
            Arc::new(NotificationService::new(Arc::clone(&notification_repo)));
        let feed = Arc::new(FeedHub::new(config.feed.buffer_size));

        let app_state = AppState {
            config: Arc::new(config.clone()),
            db_pool: db_pool.clone(),
            jwt: Arc::new(JwtValidator::new(&config.auth)),
            notification_service: Arc::clone(&notification_service),
            feed: Arc::clone(&feed),
        };

        let router = campus_api::router::build_router(app_state);

        Self {
            router,
            db_pool,
            config,
            feed,
            notification_service,
        }
    }

    /// Clean all test data from the database.
    async fn clean_database(pool: &PgPool) {
        let _ = sqlx::query("DELETE FROM notifications").execute(pool).await;
    }

    /// Issue a bearer token for the given user.
    pub fn issue_token(&self, user_id: Uuid, username: &str, role: &str) -> String {
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            role: role.to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as u64,
            iss: self.config.auth.issuer.clone(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .expect("Failed to encode token")
    }

    /// Insert a notification row directly and return its ID.
    pub async fn seed_notification(&self, user_id: Uuid, kind: &str, is_read: bool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO notifications (id, user_id, kind, title, message, is_read, created_at)
               VALUES ($1, $2, $3, $4, 'seeded', $5, NOW())"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(kind)
        .bind(format!("seeded {kind}"))
        .bind(is_read)
        .execute(&self.db_pool)
        .await
        .expect("Failed to seed notification");
        id
    }

    /// Make an HTTP request to the test app.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Parsed JSON body.
    pub body: Value,
}
