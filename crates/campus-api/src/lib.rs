//! # campus-api
//!
//! HTTP API layer for Campus Notify built on Axum.
//!
//! Provides the notification REST endpoints, the WebSocket feed delivery
//! endpoint, JWT bearer authentication, DTOs, and error mapping.

pub mod auth;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
