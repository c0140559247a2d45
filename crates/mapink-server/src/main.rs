//! MapInk State Server
//!
//! Holds the canonical annotation state, accepts authorized saves over HTTP,
//! and pushes every accepted state to all WebSocket subscribers.
//!
//! ## Protocol
//!
//! - `GET /api/state` returns the current snapshot.
//! - `POST /api/state` replaces it; the `x-admin-password` header must match
//!   the server's admin password or the save is rejected with 401.
//! - `GET /ws` upgrades to a WebSocket that receives the current state on
//!   connect and then every accepted save as
//!   `{ "type": "state", "state": { "version": n, "objects": [...] } }`.
//!   Inbound text frames (client keepalives) are read and discarded.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use futures_util::{SinkExt, StreamExt};
use mapink_core::persist::ADMIN_HEADER;
use mapink_core::sync::{ServerMessage, StateSnapshot};
use serde::Deserialize;
use serde_json::json;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::sync::{RwLock, broadcast};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// Body of a save request. Extra fields are ignored; a missing `objects`
/// array rejects the save.
#[derive(Debug, Deserialize)]
struct SavePayload {
    objects: Vec<mapink_core::SceneObject>,
}

/// Shared application state
struct AppState {
    /// Current canonical snapshot
    snapshot: RwLock<StateSnapshot>,
    /// Broadcast channel feeding all WebSocket subscribers
    tx: broadcast::Sender<String>,
    /// Where the snapshot is persisted between runs
    state_path: PathBuf,
    /// Credential that authorizes saves
    admin_password: String,
}

impl AppState {
    fn new(snapshot: StateSnapshot, state_path: PathBuf, admin_password: String) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            snapshot: RwLock::new(snapshot),
            tx,
            state_path,
            admin_password,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mapink_server=info,tower_http=info".into()),
        )
        .init();

    let admin_password = std::env::var("MAPINK_ADMIN_PASSWORD").unwrap_or_else(|_| {
        warn!("MAPINK_ADMIN_PASSWORD not set, using default password");
        "changeme".to_string()
    });
    let state_path = PathBuf::from(
        std::env::var("MAPINK_STATE_PATH").unwrap_or_else(|_| "mapink_state.json".to_string()),
    );

    let snapshot = load_snapshot(&state_path);
    info!(
        "loaded state v{} with {} objects",
        snapshot.version,
        snapshot.objects.len()
    );

    let state = Arc::new(AppState::new(snapshot, state_path, admin_password));

    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/state", get(get_state))
        .route("/api/state", post(post_state))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3030));
    info!("MapInk state server listening on {}", addr);
    info!("WebSocket endpoint: ws://localhost:3030/ws");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Read the persisted snapshot, falling back to an empty one.
fn load_snapshot(path: &PathBuf) -> StateSnapshot {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("state file unreadable ({}), starting empty", e);
                StateSnapshot {
                    version: 0,
                    objects: Vec::new(),
                }
            }
        },
        Err(_) => StateSnapshot {
            version: 0,
            objects: Vec::new(),
        },
    }
}

/// Index page
async fn index() -> &'static str {
    "MapInk State Server - state at /api/state, updates via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Return the current snapshot.
async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    axum::Json(snapshot.clone())
}

/// Replace the state. Requires the admin credential; bumps the version,
/// persists to disk, and broadcasts the new snapshot to all subscribers.
async fn post_state(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let credential = headers
        .get(ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if credential != state.admin_password {
        warn!("save rejected: bad credential");
        return (
            StatusCode::UNAUTHORIZED,
            axum::Json(json!({"detail": "invalid admin password"})),
        );
    }

    let payload: SavePayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({"detail": format!("invalid body: {}", e)})),
            );
        }
    };

    let snapshot = {
        let mut snapshot = state.snapshot.write().await;
        snapshot.version += 1;
        snapshot.objects = payload.objects;
        snapshot.clone()
    };

    if let Err(e) = persist_snapshot(&state.state_path, &snapshot).await {
        warn!("state persist failed: {}", e);
    }

    info!(
        "state v{} saved with {} objects",
        snapshot.version,
        snapshot.objects.len()
    );

    // Subscribers get the full new state; a lagging or absent receiver set
    // is not an error.
    if let Ok(json) = serde_json::to_string(&ServerMessage::State {
        state: snapshot.clone(),
    }) {
        let _ = state.tx.send(json);
    }

    (
        StatusCode::OK,
        axum::Json(json!({"ok": true, "version": snapshot.version})),
    )
}

async fn persist_snapshot(path: &PathBuf, snapshot: &StateSnapshot) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    tokio::fs::write(path, json).await
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket subscriber: send the current state, then forward
/// every broadcast until the peer goes away.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4();
    info!("subscriber connected: {}", peer_id);

    let mut rx = state.tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let initial = {
        let snapshot = state.snapshot.read().await;
        serde_json::to_string(&ServerMessage::State {
            state: snapshot.clone(),
        })
    };
    match initial {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                info!("subscriber gone before initial state: {}", peer_id);
                return;
            }
        }
        Err(e) => {
            warn!("could not encode state for {}: {}", peer_id, e);
            return;
        }
    }

    loop {
        tokio::select! {
            broadcast = rx.recv() => {
                match broadcast {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Each message is a full snapshot, so only the
                        // latest matters; resend it after a lag.
                        warn!("subscriber {} lagged by {} messages", peer_id, skipped);
                        let snapshot = state.snapshot.read().await;
                        if let Ok(json) = serde_json::to_string(&ServerMessage::State {
                            state: snapshot.clone(),
                        }) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            inbound = receiver.next() => {
                match inbound {
                    // Keepalive text frames carry no meaning; read and drop.
                    Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }
        }
    }

    info!("subscriber disconnected: {}", peer_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_payload_requires_objects() {
        assert!(serde_json::from_str::<SavePayload>(r#"{"other": 1}"#).is_err());
        assert!(serde_json::from_str::<SavePayload>(r#"{"objects": []}"#).is_ok());
    }

    #[test]
    fn test_save_payload_ignores_extra_fields() {
        let payload: SavePayload =
            serde_json::from_str(r#"{"objects": [], "client": "mapink"}"#).unwrap();
        assert!(payload.objects.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let snapshot = StateSnapshot {
            version: 4,
            objects: Vec::new(),
        };
        persist_snapshot(&path, &snapshot).await.unwrap();

        let loaded = load_snapshot(&path);
        assert_eq!(loaded.version, 4);
    }

    #[test]
    fn test_missing_state_file_starts_empty() {
        let loaded = load_snapshot(&PathBuf::from("/nonexistent/state.json"));
        assert_eq!(loaded.version, 0);
        assert!(loaded.objects.is_empty());
    }
}
