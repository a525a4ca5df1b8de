//! Server gateway for the notification client.
//!
//! The cache only updates after one of these calls succeeds, so every
//! implementation must report failures faithfully rather than swallowing
//! them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use campus_core::error::AppError;
use campus_core::result::AppResult;
use campus_core::types::pagination::{PageRequest, PageResponse};
use campus_entity::notification::Notification;
use campus_service::context::RequestContext;
use campus_service::notification::NotificationService;

/// Store operations as seen from one authenticated session.
///
/// The gateway is already bound to a user; ownership enforcement happens
/// server-side.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Fetch one page of notifications, newest first.
    async fn fetch_page(&self, page: PageRequest) -> AppResult<PageResponse<Notification>>;
    /// Fetch the server-side unread count.
    async fn unread_count(&self) -> AppResult<u64>;
    /// Mark one notification read.
    async fn mark_read(&self, id: Uuid) -> AppResult<()>;
    /// Mark all notifications read; returns the count affected.
    async fn mark_all_read(&self) -> AppResult<u64>;
    /// Delete one notification.
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// In-process gateway over the [`NotificationService`].
///
/// Used when the consumer runs inside the server process (and by tests
/// that exercise the full store path without HTTP).
#[derive(Debug, Clone)]
pub struct LocalGateway {
    service: Arc<NotificationService>,
    ctx: RequestContext,
}

impl LocalGateway {
    /// Create a gateway bound to the given session context.
    pub fn new(service: Arc<NotificationService>, ctx: RequestContext) -> Self {
        Self { service, ctx }
    }
}

#[async_trait]
impl NotificationGateway for LocalGateway {
    async fn fetch_page(&self, page: PageRequest) -> AppResult<PageResponse<Notification>> {
        self.service.list(&self.ctx, page).await
    }

    async fn unread_count(&self) -> AppResult<u64> {
        self.service
            .unread_count(&self.ctx)
            .await
            .map(|count| count.max(0) as u64)
    }

    async fn mark_read(&self, id: Uuid) -> AppResult<()> {
        self.service.mark_read(&self.ctx, id).await
    }

    async fn mark_all_read(&self) -> AppResult<u64> {
        self.service.mark_all_read(&self.ctx).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.service.delete(&self.ctx, id).await
    }
}

/// Remote gateway over the HTTP API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

/// Standard `{ success, data }` envelope used by the API.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[allow(dead_code)]
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
struct UnreadCountBody {
    unread_count: u64,
}

#[derive(Debug, Deserialize)]
struct MarkedBody {
    marked: u64,
}

impl HttpGateway {
    /// Create a gateway against `base_url` authenticating with the given
    /// bearer token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn check(&self, response: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 => AppError::unauthorized(message),
            403 => AppError::forbidden(message),
            404 => AppError::not_found(message),
            500..=599 => AppError::service_unavailable(message),
            _ => AppError::internal(format!("Unexpected status {status}: {message}")),
        })
    }

    fn transport_err(err: reqwest::Error) -> AppError {
        AppError::with_source(
            campus_core::error::ErrorKind::ServiceUnavailable,
            format!("Notification API unreachable: {err}"),
            err,
        )
    }
}

#[async_trait]
impl NotificationGateway for HttpGateway {
    async fn fetch_page(&self, page: PageRequest) -> AppResult<PageResponse<Notification>> {
        let response = self
            .http
            .get(self.url("/notifications"))
            .query(&[("page", page.page), ("limit", page.page_size)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::transport_err)?;
        let body: Envelope<PageResponse<Notification>> = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(Self::transport_err)?;
        Ok(body.data)
    }

    async fn unread_count(&self) -> AppResult<u64> {
        let response = self
            .http
            .get(self.url("/notifications/unread-count"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::transport_err)?;
        let body: Envelope<UnreadCountBody> = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(Self::transport_err)?;
        Ok(body.data.unread_count)
    }

    async fn mark_read(&self, id: Uuid) -> AppResult<()> {
        let response = self
            .http
            .put(self.url(&format!("/notifications/{id}/read")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::transport_err)?;
        self.check(response).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> AppResult<u64> {
        let response = self
            .http
            .put(self.url("/notifications/read-all"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::transport_err)?;
        let body: Envelope<MarkedBody> = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(Self::transport_err)?;
        Ok(body.data.marked)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("/notifications/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::transport_err)?;
        self.check(response).await?;
        Ok(())
    }
}
