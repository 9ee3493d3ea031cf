//! HTTP surface of the dispatcher: the WebSocket upgrade plus health and metrics.

use axum::Json;
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use roadhelp_core::identity::decode_identity;
use roadhelp_core::model::Identity;

use crate::connection::handle::ConnectionInfo;
use crate::connection::heartbeat::run_heartbeat;
use crate::metrics::MetricsSnapshot;
use crate::server::RealtimeEngine;

/// Query parameter for WebSocket authentication.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session token.
    pub token: Option<String>,
}

/// Health response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process answers.
    pub status: String,
    /// Live connections.
    pub connections: usize,
    /// Distinct connected users.
    pub users: usize,
}

/// Builds the dispatcher router.
pub fn router(engine: RealtimeEngine) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/health", get(health))
        .route("/api/metrics", get(metrics))
        .route("/api/connections", get(connections))
        .with_state(engine)
}

/// GET /api/health
async fn health(State(engine): State<RealtimeEngine>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connections: engine.connections.connection_count(),
        users: engine.connections.user_count(),
    })
}

/// GET /api/metrics
async fn metrics(State(engine): State<RealtimeEngine>) -> Json<MetricsSnapshot> {
    Json(engine.metrics.snapshot())
}

/// GET /api/connections
async fn connections(State(engine): State<RealtimeEngine>) -> Json<Vec<ConnectionInfo>> {
    Json(engine.connections.connection_infos().await)
}

/// GET /ws?token={jwt}: WebSocket upgrade
async fn ws_handler(
    State(engine): State<RealtimeEngine>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = query.token else {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    };
    let identity = match decode_identity(&token) {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "Rejected WebSocket upgrade");
            return (StatusCode::UNAUTHORIZED, e.message).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(engine, identity, socket))
}

/// Pumps one established WebSocket until either side goes away.
async fn handle_socket(engine: RealtimeEngine, identity: Identity, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (handle, mut outbound_rx) = engine.connections.register(identity);
    let conn_id = handle.id;

    let mut heartbeat = tokio::spawn(run_heartbeat(handle.clone(), engine.heartbeat_config()));
    let mut shutdown = engine.shutdown_receiver();

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else { break };
                if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    engine.connections.handle_inbound(&conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = handle.closed() => break,
            _ = &mut heartbeat => break,
            _ = shutdown.recv() => break,
        }
    }

    heartbeat.abort();
    let _ = ws_tx.close().await;
    engine.connections.unregister(&conn_id);

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
