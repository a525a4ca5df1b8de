//! Feed source trait — the seam that makes the transport swappable.

use async_trait::async_trait;
use uuid::Uuid;

use crate::subscription::FeedSubscription;

/// A source of per-recipient notification insert events.
///
/// Implementations must deliver only events whose `user_id` matches the
/// subscribed user, in per-user insertion order. The in-process
/// [`crate::FeedHub`] is the default implementation; a WebSocket or
/// polling client could implement the same contract.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Open a subscription for one recipient.
    async fn subscribe(&self, user_id: Uuid) -> FeedSubscription;
}
