//! HTTP router and WebSocket call handling
//!
//! The provider connects to the WebSocket path and exchanges the JSON wire
//! protocol. The read loop parses control frames into session events; a
//! writer task drains the session's outbound frames back onto the socket.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use voicebot_pipeline::CallSession;
use voicebot_transport::{parse_inbound, InboundEvent, OutboundFrame};

use crate::state::AppState;

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let ws_path = state.settings.server.ws_path.clone();

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route(&ws_path, get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "active_calls": state.sessions.count(),
    }))
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_call(socket, state))
}

/// Drive one call over an accepted socket
async fn handle_call(socket: WebSocket, state: AppState) {
    let id = uuid::Uuid::new_v4().to_string();

    if let Err(e) = state.sessions.begin(&id) {
        tracing::warn!(session = %id, error = %e, "Rejecting call");
        return;
    }

    let (out_tx, mut out_rx) = mpsc::channel::<OutboundFrame>(256);
    let (evt_tx, evt_rx) = mpsc::channel::<InboundEvent>(256);

    let session = CallSession::new(
        id.clone(),
        state.session_config.clone(),
        state.script.clone(),
        state.speech.clone(),
        out_tx,
    );
    let session_task = tokio::spawn(session.run(evt_rx));

    let (mut sink, mut stream) = socket.split();

    // Writer: session frames onto the wire; ends when the session drops its
    // outbound sender
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if sink.send(Message::Text(frame.to_json())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Reader: wire frames into session events
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match parse_inbound(&text) {
                Ok(event) => {
                    state.sessions.touch(&id);
                    let stopped = event == InboundEvent::Stop;
                    if evt_tx.send(event).await.is_err() {
                        break;
                    }
                    if stopped {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(session = %id, error = %e, "Ignoring unparseable frame");
                }
            },
            Message::Close(_) => break,
            // Binary, ping and pong frames are not part of the protocol
            _ => {}
        }
    }

    // Closing the event channel tears the session down
    drop(evt_tx);
    let _ = session_task.await;
    let _ = writer.await;

    state.sessions.end(&id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use voicebot_config::{DialogScript, Settings};
    use voicebot_speech::MockSpeech;

    fn test_state() -> AppState {
        AppState::new(
            Settings::default(),
            Arc::new(DialogScript::default()),
            Arc::new(MockSpeech::new()),
        )
    }

    #[tokio::test]
    async fn test_router_builds() {
        let _router = create_router(test_state());
    }

    #[tokio::test]
    async fn test_health_reports_active_calls() {
        let state = test_state();
        state.sessions.begin("x").unwrap();

        let Json(body) = health(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_calls"], 1);
    }
}
