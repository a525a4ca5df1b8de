//! Subscription handle for one recipient's feed.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use campus_entity::notification::Notification;

/// A live subscription to one user's insert events.
///
/// Dropping the handle (or calling [`FeedSubscription::unsubscribe`],
/// which is idempotent and safe from any task) stops delivery
/// immediately: no further events are observable once it returns.
#[derive(Debug)]
pub struct FeedSubscription {
    user_id: Uuid,
    rx: Option<broadcast::Receiver<Notification>>,
    channels: Arc<DashMap<Uuid, broadcast::Sender<Notification>>>,
}

impl FeedSubscription {
    pub(crate) fn new(
        user_id: Uuid,
        rx: broadcast::Receiver<Notification>,
        channels: Arc<DashMap<Uuid, broadcast::Sender<Notification>>>,
    ) -> Self {
        Self {
            user_id,
            rx: Some(rx),
            channels,
        }
    }

    /// The recipient this subscription is filtered to.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Receive the next event. Returns `None` once the subscription is
    /// closed (unsubscribed, or the hub side was dropped).
    ///
    /// A lagged receiver skips the overwritten events and keeps going;
    /// delivery is at-least-once overall and consumers dedupe by id, so
    /// the caller recovers exact state by refetching from the store.
    pub async fn recv(&mut self) -> Option<Notification> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        user_id = %self.user_id,
                        skipped,
                        "Feed subscription lagged; events dropped"
                    );
                }
            }
        }
    }

    /// Stop delivery. Safe to call multiple times and from a different
    /// task than the one that subscribed.
    pub fn unsubscribe(&mut self) {
        if self.rx.take().is_some() {
            self.release_channel();
        }
    }

    /// Drop the per-user channel once its last subscriber is gone.
    fn release_channel(&self) {
        self.channels
            .remove_if(&self.user_id, |_, tx| tx.receiver_count() == 0);
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
