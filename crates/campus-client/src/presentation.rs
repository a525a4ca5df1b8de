//! Delivery/presentation adapter — click-through routes and transient alerts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campus_entity::notification::{Notification, NotificationKind};

/// Frontend route for a notification kind, if one applies.
///
/// Pure function of `(kind, reference_id)`. Kinds this build does not
/// recognize navigate nowhere rather than failing.
pub fn route_for(kind: NotificationKind, reference_id: Option<Uuid>) -> Option<String> {
    match kind {
        NotificationKind::GradeInput => Some(match reference_id {
            Some(student) => format!("/students/{student}/grades"),
            None => "/grades".to_string(),
        }),
        NotificationKind::AttendanceInput => Some(match reference_id {
            Some(student) => format!("/students/{student}/attendance"),
            None => "/attendance".to_string(),
        }),
        NotificationKind::AssignmentCreated
        | NotificationKind::AssignmentSubmitted
        | NotificationKind::AssignmentGraded => Some(match reference_id {
            Some(assignment) => format!("/assignments/{assignment}"),
            None => "/assignments".to_string(),
        }),
        NotificationKind::MaterialUploaded => Some(match reference_id {
            Some(material) => format!("/materials/{material}"),
            None => "/materials".to_string(),
        }),
        NotificationKind::UserCreated => Some(match reference_id {
            Some(user) => format!("/admin/users/{user}"),
            None => "/admin/users".to_string(),
        }),
        NotificationKind::PasswordReset => Some("/settings/security".to_string()),
        NotificationKind::System => Some("/notifications".to_string()),
        NotificationKind::Other => None,
    }
}

/// A transient alert derived from a feed-delivered notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// The notification that triggered the alert.
    pub notification_id: Uuid,
    /// Notification category.
    pub kind: NotificationKind,
    /// Alert title.
    pub title: String,
    /// Alert body.
    pub message: String,
    /// Click-through route, if the kind has one.
    pub route: Option<String>,
}

impl Alert {
    /// Build an alert from a notification.
    pub fn from_notification(notification: &Notification) -> Self {
        Self {
            notification_id: notification.id,
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            route: route_for(notification.kind, notification.reference_id),
        }
    }
}

/// Sink for transient alerts.
///
/// Separates the presentation side effect from cache reconciliation; the
/// UI layer implements this, tests record into a buffer.
pub trait AlertSink: Send + Sync {
    /// Display an ephemeral alert.
    fn alert(&self, alert: Alert);
}

/// Default sink that logs alerts through `tracing`.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn alert(&self, alert: Alert) {
        tracing::info!(
            notification_id = %alert.notification_id,
            kind = %alert.kind,
            title = %alert.title,
            route = alert.route.as_deref().unwrap_or("-"),
            "Notification alert"
        );
    }
}
