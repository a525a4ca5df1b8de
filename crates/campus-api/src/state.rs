//! Application state shared across all handlers.

use std::sync::Arc;

use sqlx::PgPool;

use campus_core::config::AppConfig;
use campus_feed::hub::FeedHub;
use campus_service::notification::NotificationService;

use crate::auth::JwtValidator;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool.
    pub db_pool: PgPool,
    /// JWT bearer token validator.
    pub jwt: Arc<JwtValidator>,
    /// Notification store operations.
    pub notification_service: Arc<NotificationService>,
    /// In-process feed hub delivering insert events to WebSocket sessions.
    pub feed: Arc<FeedHub>,
}
