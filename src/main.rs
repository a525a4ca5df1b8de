//! Campus Notify server — notification subsystem for the school MIS.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use campus_api::auth::JwtValidator;
use campus_api::state::AppState;
use campus_core::config::AppConfig;
use campus_core::error::AppError;
use campus_database::repositories::notification::NotificationRepository;
use campus_feed::hub::FeedHub;
use campus_feed::pg_bridge::PgFeedBridge;
use campus_service::notification::NotificationService;

#[tokio::main]
async fn main() {
    let env = std::env::var("CAMPUS_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Campus Notify v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db_pool = campus_database::connection::create_pool(&config.database).await?;

    tracing::info!("Running database migrations...");
    campus_database::migration::run_migrations(&db_pool).await?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Repositories and services ────────────────────────
    let notification_repo = Arc::new(NotificationRepository::new(
        db_pool.clone(),
        config.feed.channel.clone(),
    ));
    let notification_service = Arc::new(NotificationService::new(Arc::clone(&notification_repo)));

    // ── Step 3: Feed hub and Postgres bridge ─────────────────────
    let feed_hub = Arc::new(FeedHub::new(config.feed.buffer_size));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let bridge = PgFeedBridge::new(db_pool.clone(), Arc::clone(&feed_hub), config.feed.clone());
    let bridge_handle = bridge.spawn(shutdown_rx.clone());
    tracing::info!(channel = %config.feed.channel, "Feed bridge started");

    // ── Step 4: Retention sweeper ────────────────────────────────
    let sweeper_handle = spawn_retention_sweeper(
        Arc::clone(&notification_repo),
        config.notifications.clone(),
        shutdown_rx.clone(),
    );

    // ── Step 5: Build and start HTTP server ──────────────────────
    let jwt = Arc::new(JwtValidator::new(&config.auth));
    let app_state = AppState {
        config: Arc::new(config.clone()),
        db_pool: db_pool.clone(),
        jwt,
        notification_service,
        feed: feed_hub,
    };

    let app = campus_api::router::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Campus Notify server listening on {addr}");

    // ── Step 6: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 7: Wait for background tasks ────────────────────────
    tracing::info!("Waiting for background tasks to complete...");
    let _ = tokio::time::timeout(Duration::from_secs(10), bridge_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(10), sweeper_handle).await;

    tracing::info!("Campus Notify server shut down gracefully");
    Ok(())
}

/// Periodically enforce the retention policy: drop rows past the age
/// limit, then trim each user to the per-user cap.
fn spawn_retention_sweeper(
    repo: Arc<NotificationRepository>,
    config: campus_core::config::notifications::NotificationsConfig,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(config.sweep_interval_seconds));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Retention sweeper shutting down");
                        return;
                    }
                }
                _ = interval.tick() => {
                    let cutoff = chrono::Utc::now()
                        - chrono::Duration::days(i64::from(config.retention_days));
                    match repo.delete_older_than(cutoff).await {
                        Ok(expired) => {
                            if expired > 0 {
                                tracing::info!(expired, "Retention sweep removed aged notifications");
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "Retention sweep failed"),
                    }
                    match repo.trim_per_user(config.max_stored_per_user as i64).await {
                        Ok(trimmed) => {
                            if trimmed > 0 {
                                tracing::info!(trimmed, "Retention sweep trimmed per-user overflow");
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "Per-user trim failed"),
                    }
                }
            }
        }
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
