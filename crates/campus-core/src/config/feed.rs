//! Change feed configuration.

use serde::{Deserialize, Serialize};

/// Settings for the per-user change feed and its Postgres bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Postgres NOTIFY channel carrying notification inserts.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Buffer size of each per-user broadcast channel.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Initial reconnect backoff in milliseconds.
    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_ms: u64,
    /// Maximum reconnect backoff in milliseconds.
    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            buffer_size: default_buffer_size(),
            reconnect_initial_ms: default_reconnect_initial(),
            reconnect_max_ms: default_reconnect_max(),
        }
    }
}

fn default_channel() -> String {
    "campus_notifications".to_string()
}

fn default_buffer_size() -> usize {
    256
}

fn default_reconnect_initial() -> u64 {
    500
}

fn default_reconnect_max() -> u64 {
    30_000
}
