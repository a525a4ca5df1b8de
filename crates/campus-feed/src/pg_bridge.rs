//! Postgres LISTEN/NOTIFY bridge into the in-process hub.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use campus_core::config::feed::FeedConfig;
use campus_entity::notification::Notification;

use crate::hub::FeedHub;

/// Listens on the notification NOTIFY channel and republishes each insert
/// payload into the [`FeedHub`].
///
/// The NOTIFY is emitted inside the insert transaction, so payloads arrive
/// at commit — the same instant polling reads start seeing the row. On
/// connection loss the bridge reconnects with exponential backoff,
/// resetting after a successful receive; deliveries missed while
/// disconnected surface on the next client fetch.
#[derive(Debug)]
pub struct PgFeedBridge {
    pool: PgPool,
    hub: Arc<FeedHub>,
    config: FeedConfig,
}

impl PgFeedBridge {
    /// Create a new bridge.
    pub fn new(pool: PgPool, hub: Arc<FeedHub>, config: FeedConfig) -> Self {
        Self { pool, hub, config }
    }

    /// Spawn the listen loop. The task exits when `shutdown` flips true.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff = Duration::from_millis(self.config.reconnect_initial_ms);
            let max_backoff = Duration::from_millis(self.config.reconnect_max_ms);

            loop {
                let mut listener = match self.connect().await {
                    Ok(listener) => listener,
                    Err(e) => {
                        warn!(error = %e, backoff_ms = backoff.as_millis() as u64,
                              "Feed bridge connect failed; retrying");
                        if sleep_or_shutdown(&mut shutdown, backoff).await {
                            break;
                        }
                        backoff = (backoff * 2).min(max_backoff);
                        continue;
                    }
                };

                info!(channel = %self.config.channel, "Feed bridge listening");

                loop {
                    tokio::select! {
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                info!("Feed bridge shutting down");
                                return;
                            }
                        }
                        msg = listener.recv() => match msg {
                            Ok(event) => {
                                backoff = Duration::from_millis(self.config.reconnect_initial_ms);
                                self.handle_payload(event.payload());
                            }
                            Err(e) => {
                                warn!(error = %e, "Feed bridge connection lost; reconnecting");
                                break;
                            }
                        }
                    }
                }

                if sleep_or_shutdown(&mut shutdown, backoff).await {
                    break;
                }
                backoff = (backoff * 2).min(max_backoff);
            }
        })
    }

    async fn connect(&self) -> Result<PgListener, sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(&self.config.channel).await?;
        Ok(listener)
    }

    fn handle_payload(&self, payload: &str) {
        match serde_json::from_str::<Notification>(payload) {
            Ok(notification) => {
                let delivered = self.hub.publish(notification);
                debug!(delivered, "Feed bridge republished insert event");
            }
            Err(e) => {
                // A malformed payload is a producer bug; skip it rather
                // than wedging the stream.
                error!(error = %e, "Feed bridge received undecodable payload");
            }
        }
    }
}

/// Sleep for `duration`, returning `true` if shutdown was requested first.
async fn sleep_or_shutdown(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.changed() => *shutdown.borrow(),
    }
}
