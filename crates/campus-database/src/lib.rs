//! # campus-database
//!
//! PostgreSQL connection management, embedded migrations, and repository
//! implementations for Campus Notify.

pub mod connection;
pub mod migration;
pub mod repositories;
