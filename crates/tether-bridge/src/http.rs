// Copyright (c) 2024-2026 Tether Contributors
//
// SPDX-License-Identifier: Apache-2.0
//!
//! HTTP surface — every network endpoint of the bridge.
//!
//! ```text
//! GET  /.well-known/agent-card.json      descriptor
//! POST /tasks                            201 { "id": <sessionId> }
//! POST /tasks/{taskId}/messages/stream   validate id, route body, open SSE
//! POST /tasks/{taskId}/messages          alias
//! POST /v1/tasks/{taskId}/messages       alias
//! POST /v1/message:stream                alias, current session
//! POST /                                 alias, current session
//! GET  /ws                               framed-socket upgrade
//! *                                      404 { "error": "Not Found" }
//! ```
//!
//! The alias spread exists for protocol compatibility; every stream
//! route lands in the same handler. A malformed JSON body is a 400 for
//! that request and nothing more — the server keeps serving.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    card::AgentCard,
    inbound::InputRouter,
    peer::{Peer, TransportKind},
    registry::PeerRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub session_id: Arc<str>,
    pub card: Arc<AgentCard>,
    pub registry: Arc<PeerRegistry>,
    pub inbound: Arc<InputRouter>,
    pub queue_capacity: usize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/.well-known/agent-card.json", get(agent_card))
        .route("/tasks", post(create_task))
        .route("/tasks/{task_id}/messages/stream", post(stream_for_task))
        .route("/tasks/{task_id}/messages", post(stream_for_task))
        .route("/v1/tasks/{task_id}/messages", post(stream_for_task))
        .route("/v1/message:stream", post(stream_current))
        .route("/", post(stream_current))
        .route("/ws", get(ws_handler))
        // Wrong method on a known path is still "Not Found" to clients.
        .method_not_allowed_fallback(not_found)
        .fallback(not_found)
        .with_state(state)
}

async fn agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json((*state.card).clone())
}

async fn create_task(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": &*state.session_id })),
    )
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
}

fn invalid_json() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": "Invalid JSON payload" })),
    )
        .into_response()
}

// ── SSE transport ─────────────────────────────────────────────────────────────

async fn stream_for_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    if task_id != *state.session_id {
        debug!(%task_id, "stream request for unknown task");
        return not_found().await.into_response();
    }
    open_sse_stream(state, body).await
}

async fn stream_current(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    open_sse_stream(state, body).await
}

/// Route the posted message, then answer with this peer's event stream.
/// The stream stays open until the client disconnects or the bridge
/// shuts down.
async fn open_sse_stream(
    state: AppState,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let Json(message) = match body {
        Ok(json) => json,
        Err(rejection) => {
            debug!("rejecting stream request: {rejection}");
            return invalid_json();
        }
    };

    // Register before routing the body, so events the message provokes
    // (input echo, confirmation follow-ups) reach this peer too.
    let peer = Arc::new(Peer::new(TransportKind::Sse, state.queue_capacity));
    let peer_id = state.registry.register(peer.clone());
    state.inbound.handle_value(peer_id, message).await;

    let guard = PeerGuard {
        registry: state.registry.clone(),
        peer_id,
    };
    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(frame) = peer.queue().pop().await {
            yield Ok::<_, Infallible>(Event::default().data(String::from_utf8_lossy(&frame)));
        }
    };
    Sse::new(stream).into_response()
}

/// Unregisters the peer when its SSE stream is dropped, whether by
/// client disconnect or by server shutdown.
struct PeerGuard {
    registry: Arc<PeerRegistry>,
    peer_id: Uuid,
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.peer_id);
    }
}

// ── Framed-socket transport ───────────────────────────────────────────────────

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Bridge one framed-socket peer: inbound frames to the input router,
/// queued event frames to the socket.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let peer = Arc::new(Peer::new(TransportKind::FramedSocket, state.queue_capacity));
    let peer_id = state.registry.register(peer.clone());

    loop {
        tokio::select! {
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    state.inbound.handle_frame(peer_id, text.as_bytes()).await;
                }
                Some(Ok(Message::Binary(data))) => {
                    state.inbound.handle_frame(peer_id, &data).await;
                }
                Some(Ok(Message::Ping(payload))) => {
                    if socket.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(peer = %peer_id, "socket recv error: {e}");
                    break;
                }
            },
            outbound = peer.queue().pop() => match outbound {
                Some(frame) => {
                    if socket.send(Message::Binary(frame.into())).await.is_err() {
                        break;
                    }
                }
                // Queue closed — the bridge is shutting down.
                None => break,
            }
        }
    }

    state.registry.unregister(&peer_id);
    info!(peer = %peer_id, "framed-socket peer closed");
}
