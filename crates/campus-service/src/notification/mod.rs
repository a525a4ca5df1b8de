//! Notification business operations.

pub mod service;

pub use service::NotificationService;
