//! HTTP and WebSocket handlers.

pub mod health;
pub mod notification;
pub mod ws;
