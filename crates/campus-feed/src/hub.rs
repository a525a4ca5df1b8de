//! In-process feed hub — per-user broadcast fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use campus_entity::notification::Notification;

use crate::source::FeedSource;
use crate::subscription::FeedSubscription;

/// Fans notification inserts out to subscribers of the matching user.
///
/// One bounded broadcast channel per user with at least one live
/// subscriber; channels are dropped when their last subscriber leaves.
/// Publishing to a user with no subscribers is a no-op (the store is the
/// source of truth, the feed is best-effort push).
#[derive(Debug)]
pub struct FeedHub {
    /// User ID → broadcast sender.
    channels: Arc<DashMap<Uuid, broadcast::Sender<Notification>>>,
    /// Buffer size for each per-user channel.
    buffer_size: usize,
}

impl FeedHub {
    /// Create a new feed hub.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            buffer_size,
        }
    }

    /// Publish an insert event to the owning user's subscribers.
    ///
    /// Returns the number of subscribers the event was queued for.
    pub fn publish(&self, notification: Notification) -> usize {
        match self.channels.get(&notification.user_id) {
            Some(tx) => tx.send(notification).unwrap_or(0),
            None => 0,
        }
    }

    /// Number of users with at least one live subscription.
    pub fn active_users(&self) -> usize {
        self.channels.len()
    }

    fn subscribe_inner(&self, user_id: Uuid) -> FeedSubscription {
        let rx = self
            .channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.buffer_size).0)
            .subscribe();
        FeedSubscription::new(user_id, rx, Arc::clone(&self.channels))
    }
}

#[async_trait]
impl FeedSource for FeedHub {
    async fn subscribe(&self, user_id: Uuid) -> FeedSubscription {
        self.subscribe_inner(user_id)
    }
}
