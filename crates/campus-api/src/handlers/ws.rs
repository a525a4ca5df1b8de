//! WebSocket feed delivery.
//!
//! Each connection carries one feed subscription for the authenticated
//! user; insert events are forwarded as JSON text frames. Closing the
//! socket drops the subscription, so an abandoned session never holds a
//! channel open.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use campus_entity::notification::Notification;
use campus_feed::source::FeedSource;
use campus_service::context::RequestContext;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the WebSocket upgrade.
///
/// Browsers cannot set headers on WebSocket requests, so the token rides
/// in the query string.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: String,
}

/// Outbound feed frame.
#[derive(Debug, serde::Serialize)]
struct FeedFrame<'a> {
    /// Frame type discriminator, always `"notification"`.
    #[serde(rename = "type")]
    frame_type: &'static str,
    /// The inserted notification.
    data: &'a Notification,
}

/// GET /ws?token={jwt} — WebSocket upgrade.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    // Authenticate before upgrading.
    let ctx = state.jwt.validate(&query.token)?;
    Ok(ws.on_upgrade(move |socket| handle_connection(state, ctx, socket)))
}

/// Pumps feed events into an established WebSocket connection.
async fn handle_connection(state: AppState, ctx: RequestContext, socket: WebSocket) {
    let mut subscription = state.feed.subscribe(ctx.user_id).await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    info!(user_id = %ctx.user_id, "Feed connection established");

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(notification) = event else {
                    break;
                };
                let frame = FeedFrame {
                    frame_type: "notification",
                    data: &notification,
                };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(user_id = %ctx.user_id, error = %e, "Failed to encode feed frame");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // The feed is one-way; inbound frames are ignored.
                        debug!(user_id = %ctx.user_id, "Ignoring inbound frame");
                    }
                    Some(Err(e)) => {
                        warn!(user_id = %ctx.user_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
        }
    }

    subscription.unsubscribe();
    info!(user_id = %ctx.user_id, "Feed connection closed");
}
