//! WebSocket gateway (§4.11): joins a mission, then relays `Action`
//! frames in and `Message` frames out until either side closes.
//!
//! The split-socket/select loop is grounded on the pack's WS transport
//! handler (the teacher has no WS usage of its own despite declaring the
//! `axum` `ws` feature).

use super::error::ApiError;
use super::AppState;
use crate::types::{Action, Message};
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct WsJoinQuery {
    pub mission_id: Option<u64>,
    pub token: Option<String>,
}

/// `GET /ws?mission_id=&token=`. Validates the query, resolves the
/// operator's identity, then upgrades.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsJoinQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let mission_id = query.mission_id.ok_or_else(|| ApiError::bad_request("mission_id is required"))?;
    if query.token.as_deref().unwrap_or_default().is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }

    let user = resolve_user(&headers);

    // Fail fast on an unknown mission rather than upgrading and then
    // closing immediately.
    state.store.get_mission(mission_id).await.map_err(|_| ApiError::not_found("mission not found"))?;

    Ok(ws.on_upgrade(move |socket| handle_ws(state, socket, mission_id, user)))
}

/// `Remote-User`/`Remote-Name` are set by an upstream reverse proxy
/// (ported from `original_source/middleware.go`'s `InjectUser`); in debug
/// mode a fixed test identity is substituted instead.
fn resolve_user(headers: &HeaderMap) -> String {
    let config = crate::config::get();
    if config.settings.debug {
        return "debug-user".to_string();
    }
    headers
        .get("Remote-User")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

async fn handle_ws(state: AppState, socket: WebSocket, mission_id: u64, user: String) {
    let mut rx = match state.registry.join(mission_id, &user).await {
        Ok(rx) => rx,
        Err(err) => {
            warn!(mission_id, user, %err, "join failed, closing socket");
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if send_message(&mut ws_tx, &msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_inbound(&state, mission_id, &user, &text).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(mission_id, user, %err, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    if let Err(err) = state.registry.leave(mission_id, &user).await {
        warn!(mission_id, user, %err, "leave failed during socket cleanup");
    }
    info!(mission_id, user, "websocket connection closed");
}

async fn send_message(ws_tx: &mut futures::stream::SplitSink<WebSocket, WsMessage>, msg: &Message) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).unwrap_or_default();
    ws_tx.send(WsMessage::Text(text)).await
}

async fn handle_inbound(state: &AppState, mission_id: u64, user: &str, text: &str) {
    let action: Action = match serde_json::from_str(text) {
        Ok(action) => action,
        Err(err) => {
            warn!(mission_id, user, %err, "failed to parse inbound action");
            return;
        }
    };

    if let Err(err) = state.registry.submit(mission_id, action.kind, action.value, user.to_string()).await {
        warn!(mission_id, user, %err, "failed to submit action");
    }
}
