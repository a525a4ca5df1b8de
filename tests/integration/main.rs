//! Integration test harness.
//!
//! These tests exercise the full HTTP stack against a real Postgres
//! instance; they are ignored by default and run with `cargo test -- --ignored`
//! when a database configured in `config/test.toml` is available.

mod feed_test;
mod helpers;
mod notification_test;
