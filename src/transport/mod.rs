//! HTTP and WebSocket transport.
//!
//! Routes:
//! - `GET /notifications`: JSON array of the backlog, newest first.
//! - `GET /websocket`: one JSON text frame per new notification.
//! - everything else: static files of the web interface.

use std::path::Path;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::backlog::Backlog;
use crate::broadcast::BroadcastManager;
use crate::notification::Notification;

/// Shared state handed to every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Notifications served by `/notifications`.
    pub backlog: Arc<Backlog>,
    /// Fan-out every websocket registers with.
    pub broadcast: Arc<BroadcastManager>,
}

impl AppState {
    /// Bundles the shared backlog and broadcast manager.
    #[must_use]
    pub fn new(backlog: Arc<Backlog>, broadcast: Arc<BroadcastManager>) -> Self {
        Self { backlog, broadcast }
    }
}

/// Builds the application router serving static files from `html_dir`.
pub fn router(state: AppState, html_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/notifications", get(backlog_handler))
        .route("/websocket", get(websocket_handler))
        .fallback_service(ServeDir::new(html_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn backlog_handler(State(state): State<AppState>) -> Json<Vec<Arc<Notification>>> {
    Json(state.backlog.notifications())
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (tx, rx) = mpsc::channel::<Arc<Notification>>(1);

    // Registry calls may wait for an in-flight fan-out; keep them off the
    // runtime workers that drive the subscribers doing the draining.
    let broadcast = Arc::clone(&state.broadcast);
    let id = match tokio::task::spawn_blocking(move || broadcast.add(tx)).await {
        Ok(id) => id,
        Err(e) => {
            warn!("failed to register websocket: {e}");
            return;
        }
    };
    info!(subscription = %id, "websocket connected");

    let mut notifications = ReceiverStream::new(rx);
    loop {
        tokio::select! {
            next = notifications.next() => {
                let Some(notification) = next else { break };
                let json = match serde_json::to_string(&*notification) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(subscription = %id, "failed to encode notification: {e}");
                        continue;
                    }
                };
                if let Err(e) = socket.send(Message::Text(json.into())).await {
                    debug!(subscription = %id, "websocket send failed: {e}");
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                None | Some(Ok(Message::Close(_))) => break,
                Some(Err(e)) => {
                    debug!(subscription = %id, "websocket receive failed: {e}");
                    break;
                }
                Some(Ok(_)) => {}
            }
        }
    }

    // Abandon the channel before unregistering so a blocked fan-out lets go
    // of the registry lock.
    drop(notifications);
    let broadcast = Arc::clone(&state.broadcast);
    if let Err(e) = tokio::task::spawn_blocking(move || broadcast.remove(id)).await {
        warn!(subscription = %id, "failed to unregister websocket: {e}");
    }

    if let Err(e) = socket.send(Message::Close(None)).await {
        debug!(subscription = %id, "websocket close failed: {e}");
    }
    info!(subscription = %id, "websocket disconnected");
}
