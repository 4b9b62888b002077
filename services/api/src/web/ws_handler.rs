//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It drives the session's state machine and starts the work it asks for.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    results_task::results_process,
    state::{AppState, Effect, Reaction, SessionEvent, SessionState},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    info!("New WebSocket connection established, session {}.", session_id);

    let (mut sender, mut receiver) = socket.split();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let mut session = SessionState::new(session_id);

    if send_all(&mut sender, session.greeting()).await.is_err() {
        error!("Failed to send session initialized message.");
        return;
    }

    // --- Main Loop ---
    // Client frames and internal events are handled one at a time, so the
    // session never needs a lock.
    loop {
        let reaction = tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(message) => session.handle(message).await,
                    Err(e) => {
                        warn!("Failed to deserialize client message: {}", e);
                        Reaction::send(vec![ServerMessage::error(format!("Invalid message: {}", e))])
                    }
                },
                Some(Ok(Message::Close(_))) => {
                    info!("Client sent close message.");
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("WebSocket error on session {}: {}", session_id, e);
                    break;
                }
                None => {
                    info!("Client disconnected.");
                    break;
                }
            },
            Some(event) = events_rx.recv() => session.on_event(event),
        };

        for effect in reaction.effects {
            start_effect(&app_state, &events_tx, effect);
        }
        if send_all(&mut sender, reaction.messages).await.is_err() {
            error!("Failed to send to client. Closing session {}.", session_id);
            break;
        }
    }

    // --- Cleanup ---
    session.shutdown();
    info!("WebSocket connection closed, session {}.", session_id);
}

/// Spawns the work a session step asked for.
fn start_effect(
    app_state: &Arc<AppState>,
    events: &mpsc::UnboundedSender<SessionEvent>,
    effect: Effect,
) {
    match effect {
        Effect::ArmTransition { epoch } => {
            let delay = app_state.config.quiz_transition;
            let events = events.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = events.send(SessionEvent::TransitionElapsed { epoch });
            });
        }
        Effect::FetchRecommendations {
            archetype,
            epoch,
            board,
            cancel,
        } => {
            let orchestrator = app_state.orchestrator.clone();
            let events = events.clone();
            tokio::spawn(async move {
                if let Err(e) =
                    results_process(orchestrator, archetype, epoch, board, cancel, events).await
                {
                    error!("Results process failed: {}", e);
                }
            });
        }
    }
}

async fn send_all(
    sender: &mut SplitSink<WebSocket, Message>,
    messages: Vec<ServerMessage>,
) -> Result<(), axum::Error> {
    for message in messages {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server message: {}", e);
                continue;
            }
        };
        sender.send(Message::Text(json.into())).await?;
    }
    Ok(())
}
