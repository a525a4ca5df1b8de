//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::kind::NotificationKind;

/// A notification delivered to exactly one user.
///
/// `id`, `user_id`, `kind`, `title`, `message`, `reference_id`, and
/// `created_at` are immutable after creation. `is_read` is monotonic:
/// it flips from false to true exactly once and never reverts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: Uuid,
    /// The recipient user; sole authorization and filtering key.
    pub user_id: Uuid,
    /// Notification category.
    #[sqlx(try_from = "String")]
    pub kind: NotificationKind,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub message: String,
    /// Originating entity (student, assignment, ...), if any. Interpretation
    /// is owned by the business action that created the notification.
    pub reference_id: Option<Uuid>,
    /// Whether the user has read this notification.
    pub is_read: bool,
    /// When the notification was read.
    pub read_at: Option<DateTime<Utc>>,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check whether the notification is still unread.
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }
}

/// Fields supplied by a business action when creating a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    /// The recipient user.
    pub user_id: Uuid,
    /// Notification category.
    pub kind: NotificationKind,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub message: String,
    /// Originating entity, if any.
    pub reference_id: Option<Uuid>,
}

impl NewNotification {
    /// Create a new notification payload.
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            reference_id: None,
        }
    }

    /// Attach a reference to the originating entity.
    pub fn with_reference(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }
}
