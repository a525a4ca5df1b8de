//! # campus-client
//!
//! The client half of the notification flow: a per-session cache
//! ([`center::NotificationCenter`]) initialized from the store and kept
//! live by a change feed subscription. User mutations are write-through
//! (server round trip first, cache second); feed-delivered inserts are
//! the only optimistic path and are deduplicated by id.

pub mod center;
pub mod gateway;
pub mod presentation;

pub use center::NotificationCenter;
pub use gateway::{HttpGateway, LocalGateway, NotificationGateway};
pub use presentation::{Alert, AlertSink, route_for};
