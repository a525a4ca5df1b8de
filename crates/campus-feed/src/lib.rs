//! # campus-feed
//!
//! The change feed: notifies subscribers, filtered by recipient, when a
//! notification row commits. The in-process [`hub::FeedHub`] fans events
//! out over per-user broadcast channels; [`pg_bridge::PgFeedBridge`]
//! republishes Postgres `NOTIFY` payloads (emitted inside the insert
//! transaction) into the hub so every node sees every commit.
//!
//! Delivery is at-least-once: a lagged subscriber drops the oldest events
//! and consumers deduplicate by notification id.

pub mod hub;
pub mod pg_bridge;
pub mod source;
pub mod subscription;

pub use hub::FeedHub;
pub use pg_bridge::PgFeedBridge;
pub use source::FeedSource;
pub use subscription::FeedSubscription;
