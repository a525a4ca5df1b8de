//! Notification kind enumeration.

use serde::{Deserialize, Serialize};

/// Category of a notification, set by the business action that created it.
///
/// Kinds not known to this build decode to [`NotificationKind::Other`] so
/// that newer producers never break older consumers; `Other` is inert in
/// the presentation adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A grade was entered for a student.
    GradeInput,
    /// Attendance was recorded.
    AttendanceInput,
    /// A new assignment was published.
    AssignmentCreated,
    /// A student submitted an assignment.
    AssignmentSubmitted,
    /// A submission was graded.
    AssignmentGraded,
    /// Course material was uploaded.
    MaterialUploaded,
    /// A user account was created.
    UserCreated,
    /// A password reset was performed.
    PasswordReset,
    /// System-level announcements.
    System,
    /// Unrecognized kind (forward compatibility).
    #[serde(other)]
    Other,
}

impl NotificationKind {
    /// Return the kind as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GradeInput => "grade_input",
            Self::AttendanceInput => "attendance_input",
            Self::AssignmentCreated => "assignment_created",
            Self::AssignmentSubmitted => "assignment_submitted",
            Self::AssignmentGraded => "assignment_graded",
            Self::MaterialUploaded => "material_uploaded",
            Self::UserCreated => "user_created",
            Self::PasswordReset => "password_reset",
            Self::System => "system",
            Self::Other => "other",
        }
    }

    /// Parse a wire string; unknown values map to `Other`.
    pub fn parse(s: &str) -> Self {
        match s {
            "grade_input" => Self::GradeInput,
            "attendance_input" => Self::AttendanceInput,
            "assignment_created" => Self::AssignmentCreated,
            "assignment_submitted" => Self::AssignmentSubmitted,
            "assignment_graded" => Self::AssignmentGraded,
            "material_uploaded" => Self::MaterialUploaded,
            "user_created" => Self::UserCreated,
            "password_reset" => Self::PasswordReset,
            "system" => Self::System,
            _ => Self::Other,
        }
    }
}

impl TryFrom<String> for NotificationKind {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self::parse(&value))
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
