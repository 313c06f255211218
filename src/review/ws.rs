//! WebSocket server + REST endpoints for the review screen.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::model::ReviewMode;
use super::scoring::ScoringClient;
use super::session::{ReviewAction, ReviewEvent, ReviewSession};
use crate::config::TutorialConfig;
use crate::error::{Error, ScoringError};
use crate::store::KeyValueStore;
use crate::tutorial::{PersistenceGate, TutorialEvent};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub tutorial: TutorialConfig,
    pub scoring: Arc<ScoringClient>,
}

/// Build the Axum router with the review WebSocket and REST routes.
pub fn review_routes(
    store: Arc<dyn KeyValueStore>,
    tutorial: TutorialConfig,
    scoring: Arc<ScoringClient>,
) -> Router {
    let state = AppState {
        store,
        tutorial,
        scoring,
    };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/tutorial/status", get(tutorial_status))
        .route("/api/tutorial/seen", delete(reset_tutorial))
        .route("/api/score", post(score_essay))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "ielts-review"
    }))
}

// ── WebSocket ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ConnectParams {
    browser: String,
    #[serde(default)]
    mode: ReviewMode,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
) -> impl IntoResponse {
    info!(browser = %params.browser, mode = ?params.mode, "WebSocket client connecting");
    ws.on_upgrade(move |socket| async move {
        let session = ReviewSession::start(
            &params.browser,
            params.mode,
            state.store,
            state.tutorial,
            state.scoring,
        )
        .await;
        handle_socket(socket, session).await;
    })
}

async fn handle_socket(mut socket: WebSocket, session: ReviewSession) {
    // Subscribe before syncing so nothing emitted in between is lost
    let mut review_rx = session.subscribe();
    let mut tutorial_rx = session.tutorial().subscribe();

    if !send_sync(&mut socket, &session).await {
        warn!("Failed to send initial sync, client disconnected");
        session.end().await;
        return;
    }

    loop {
        tokio::select! {
            result = review_rx.recv() => {
                match result {
                    Ok(event) => {
                        if !send_json(&mut socket, &event).await {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind review events");
                        if !send_sync(&mut socket, &session).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            result = tutorial_rx.recv() => {
                match result {
                    Ok(event) => {
                        let restack = matches!(
                            event,
                            TutorialEvent::TutorialStarted { .. }
                                | TutorialEvent::TutorialFinished { .. }
                        );
                        if !send_json(&mut socket, &event).await {
                            debug!("Client disconnected during send");
                            break;
                        }
                        // Overlay visibility changed
                        if restack {
                            let layers = ReviewEvent::Layers { layers: session.layers().await };
                            if !send_json(&mut socket, &layers).await {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind tutorial events");
                        if !send_sync(&mut socket, &session).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, &session, &mut socket).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    session.end().await;
    info!(session = %session.id(), "WebSocket connection closed");
}

async fn handle_client_message(text: &str, session: &ReviewSession, socket: &mut WebSocket) {
    let action = match serde_json::from_str::<ReviewAction>(text) {
        Ok(action) => action,
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
            return;
        }
    };

    if let Err(e) = session.handle(action).await {
        warn!(session = %session.id(), error = %e, "Review action failed");
        let event = ReviewEvent::Error {
            message: client_message(&e),
        };
        send_json(socket, &event).await;
    }
}

/// The message shown to the user. Scoring failures surface verbatim.
fn client_message(error: &Error) -> String {
    match error {
        Error::Scoring(e) => e.to_string(),
        Error::Session(e) => e.to_string(),
        other => other.to_string(),
    }
}

async fn send_sync(socket: &mut WebSocket, session: &ReviewSession) -> bool {
    let sync = ReviewEvent::SessionSync {
        snapshot: Box::new(session.snapshot().await),
    };
    send_json(socket, &sync).await
}

/// Returns false once the client is gone.
async fn send_json<T: Serialize>(socket: &mut WebSocket, message: &T) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize WS message");
            true
        }
    }
}

// ── REST Endpoints ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BrowserParams {
    browser: String,
}

/// GET /api/tutorial/status?browser=
async fn tutorial_status(
    State(state): State<AppState>,
    Query(params): Query<BrowserParams>,
) -> impl IntoResponse {
    let gate = PersistenceGate::new(state.store, params.browser);
    let seen = gate.has_seen().await;
    Json(serde_json::json!({
        "browser": gate.browser_id(),
        "seen": seen,
    }))
}

/// DELETE /api/tutorial/seen?browser=
///
/// Clears the seen flag so the tour auto-starts again on the next session.
async fn reset_tutorial(
    State(state): State<AppState>,
    Query(params): Query<BrowserParams>,
) -> impl IntoResponse {
    let gate = PersistenceGate::new(state.store, params.browser);
    let reset = gate.reset().await;
    info!(browser = %gate.browser_id(), reset, "Tutorial seen flag reset");
    Json(serde_json::json!({
        "browser": gate.browser_id(),
        "reset": reset,
    }))
}

#[derive(Deserialize)]
struct ScoreRequest {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    essay: String,
}

/// POST /api/score
async fn score_essay(
    State(state): State<AppState>,
    Json(body): Json<ScoreRequest>,
) -> impl IntoResponse {
    match state.scoring.score(&body.prompt, &body.essay).await {
        Ok(result) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "processing_time": result.processing_time_label(),
                "result": result,
            })),
        ),
        Err(e) => {
            let status = match e {
                ScoringError::MissingInput => StatusCode::BAD_REQUEST,
                ScoringError::Status { .. } | ScoringError::Request(_) => StatusCode::BAD_GATEWAY,
            };
            (status, Json(serde_json::json!({"error": e.to_string()})))
        }
    }
}
