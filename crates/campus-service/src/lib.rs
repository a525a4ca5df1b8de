//! # campus-service
//!
//! Business logic for Campus Notify. Services receive an explicit
//! [`context::RequestContext`] identifying the acting user; no operation
//! reads ambient identity state.

pub mod context;
pub mod notification;
