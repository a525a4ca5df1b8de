//! Notification retention configuration.

use serde::{Deserialize, Serialize};

/// Retention policy for stored notifications.
///
/// The store would otherwise grow without bound; the sweeper task deletes
/// rows older than `retention_days` and trims each user to
/// `max_stored_per_user` rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Days after which stored notifications are deleted.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Maximum stored notifications per user.
    #[serde(default = "default_max_stored")]
    pub max_stored_per_user: u64,
    /// Interval between retention sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            max_stored_per_user: default_max_stored(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_retention_days() -> u32 {
    90
}

fn default_max_stored() -> u64 {
    1000
}

fn default_sweep_interval() -> u64 {
    3600
}
