//! Notification store operations, scoped to the requesting user.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use campus_core::result::AppResult;
use campus_core::types::pagination::{PageRequest, PageResponse};
use campus_database::repositories::notification::NotificationRepository;
use campus_entity::notification::{NewNotification, Notification};

use crate::context::RequestContext;

/// Manages user notifications.
///
/// All read and mutation paths are scoped to `ctx.user_id`; a foreign or
/// missing row surfaces as `NotFound` from the repository.
#[derive(Debug, Clone)]
pub struct NotificationService {
    /// Notification repository.
    repo: Arc<NotificationRepository>,
}

impl NotificationService {
    /// Creates a new notification service.
    pub fn new(repo: Arc<NotificationRepository>) -> Self {
        Self { repo }
    }

    /// Lists the current user's notifications, newest first.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> AppResult<PageResponse<Notification>> {
        self.repo.find_by_user(ctx.user_id, &page).await
    }

    /// Counts the current user's unread notifications.
    pub async fn unread_count(&self, ctx: &RequestContext) -> AppResult<i64> {
        self.repo.count_unread(ctx.user_id).await
    }

    /// Marks one notification as read. Idempotent; `NotFound` if the row
    /// does not exist or belongs to another user.
    pub async fn mark_read(&self, ctx: &RequestContext, notification_id: Uuid) -> AppResult<()> {
        self.repo.mark_read(notification_id, ctx.user_id).await?;
        debug!(user_id = %ctx.user_id, %notification_id, "Notification marked read");
        Ok(())
    }

    /// Marks every unread notification as read. Returns the count affected.
    pub async fn mark_all_read(&self, ctx: &RequestContext) -> AppResult<u64> {
        let marked = self.repo.mark_all_read(ctx.user_id).await?;
        debug!(user_id = %ctx.user_id, marked, "All notifications marked read");
        Ok(marked)
    }

    /// Deletes one notification under the same ownership rule as
    /// [`Self::mark_read`].
    pub async fn delete(&self, ctx: &RequestContext, notification_id: Uuid) -> AppResult<()> {
        self.repo.delete(notification_id, ctx.user_id).await?;
        debug!(user_id = %ctx.user_id, %notification_id, "Notification deleted");
        Ok(())
    }

    /// Creates a notification on behalf of a business action (grade entry,
    /// assignment publishing, ...). The insert announces itself on the
    /// feed channel within the same transaction.
    pub async fn create(&self, new: NewNotification) -> AppResult<Notification> {
        let notification = self.repo.create(&new).await?;
        info!(
            user_id = %notification.user_id,
            kind = %notification.kind,
            id = %notification.id,
            "Notification created"
        );
        Ok(notification)
    }
}
