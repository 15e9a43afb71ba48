use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::{error, info};

mod chat_client;
mod protocol;

use chat_client::HttpResponder;
use opsassist_core::actions::{builtin_actions, find_action, ActionDefinition};
use opsassist_core::config::AssistantConfig;
use opsassist_core::form::ActionForm;
use opsassist_core::mock::MockResponder;
use opsassist_core::recents::{FileRecentsStorage, RecentActionsStore};
use opsassist_core::session::{ChatSession, Responder, SubmitOutcome};
use opsassist_core::template;
use protocol::{ClientEvent, RecentActionView, ServerEvent};

/// Shown once per session when requests fall back to canned replies because
/// no live endpoint is configured.
const ENDPOINT_WARNING_TEXT: &str = "The REST API endpoint has not been set up yet. The application will automatically switch to Mock Mode to demonstrate functionality. Your request will be processed using mock data.";

// --- API Shared State ---
// Holds the long-lived chat session for each user plus the shared recent
// actions store.
pub struct ApiState {
    sessions: Mutex<HashMap<String, Arc<ChatSession>>>,
    recents: Arc<RecentActionsStore>,
    config: AssistantConfig,
    network: Arc<dyn Responder>,
}

impl ApiState {
    pub async fn get_or_create_session(&self, user_id: &str) -> Arc<ChatSession> {
        let mut map = self.sessions.lock().await;
        if let Some(session) = map.get(user_id) {
            return session.clone();
        }

        let session = Arc::new(ChatSession::new(
            user_id,
            &self.config,
            self.network.clone(),
            MockResponder::new(),
        ));
        map.insert(user_id.to_string(), session.clone());
        info!(user_id = user_id, "New chat session registered");
        session
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    dotenvy::dotenv().ok();

    let config = AssistantConfig::from_env();
    let recents_path = std::env::var("RECENT_ACTIONS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| FileRecentsStorage::default_path());
    info!(
        chat_url = %config.chat_url(),
        api_configured = config.api_configured,
        recents_path = %recents_path.display(),
        "Chat backend configured"
    );

    let recents = Arc::new(
        RecentActionsStore::open(Arc::new(FileRecentsStorage::new(recents_path))).await?,
    );
    let network: Arc<dyn Responder> = Arc::new(HttpResponder::new(&config));

    let state = Arc::new(ApiState {
        sessions: Mutex::new(HashMap::new()),
        recents,
        config,
        network,
    });

    let app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/actions", get(list_actions))
        .route("/ws/chat/:user_id", get(ws_handler))
        .with_state(state);

    let bind_addr =
        std::env::var("CHAT_BACKEND_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Operations Assistant Chat Backend listening");

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn health_check() -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        "Operations Assistant Chat Backend Operational",
    )
}

async fn list_actions() -> Json<Vec<ActionDefinition>> {
    Json(builtin_actions())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(state): State<Arc<ApiState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

async fn handle_socket(mut socket: WebSocket, user_id: String, state: Arc<ApiState>) {
    info!(user_id = %user_id, "WebSocket connected");

    let session = state.get_or_create_session(&user_id).await;
    // Every connection starts with the current sidebar contents.
    send_recents_snapshot(&mut socket, &state).await;

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let event: ClientEvent = match serde_json::from_str(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        error!(user_id = %user_id, error = %e, "Invalid client event JSON");
                        send_event(
                            &mut socket,
                            &ServerEvent::StatusUpdate {
                                status: "invalid_event".to_string(),
                                details: Some(e.to_string()),
                            },
                        )
                        .await;
                        continue;
                    }
                };
                handle_client_event(&mut socket, &user_id, &session, &state, event).await;
            }
            Message::Close(_) => {
                info!(user_id = %user_id, "WebSocket closed by client");
                break;
            }
            _ => {}
        }
    }
}

async fn handle_client_event(
    socket: &mut WebSocket,
    user_id: &str,
    session: &Arc<ChatSession>,
    state: &Arc<ApiState>,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Send { text } => {
            info!(user_id = %user_id, "User message");
            let outcome = session.submit_text(&text).await;
            send_outcome(socket, outcome).await;
        }
        ClientEvent::Action { action_id, data } => {
            let Some(action) = find_action(&action_id) else {
                error!(user_id = %user_id, action_id = %action_id, "Unknown action id");
                send_event(
                    socket,
                    &ServerEvent::StatusUpdate {
                        status: "unknown_action".to_string(),
                        details: Some(format!("no action with id '{}'", action_id)),
                    },
                )
                .await;
                return;
            };

            let mut form = ActionForm::new(action.clone());
            for (name, value) in &data {
                if let Err(e) = form.set_value(name, value) {
                    error!(user_id = %user_id, action_id = %action.id, error = %e, "Rejected form field");
                    send_event(
                        socket,
                        &ServerEvent::StatusUpdate {
                            status: "invalid_parameters".to_string(),
                            details: Some(e.to_string()),
                        },
                    )
                    .await;
                    return;
                }
            }
            if !form.is_valid() {
                send_event(
                    socket,
                    &ServerEvent::StatusUpdate {
                        status: "invalid_parameters".to_string(),
                        details: Some(form.validation_errors().join("; ")),
                    },
                )
                .await;
                return;
            }

            let data = form.into_data();
            let prompt = template::render_prompt(&action, &data);
            info!(user_id = %user_id, action_id = %action.id, prompt = %prompt, "Action submitted");

            // History update failures are logged but never block the chat.
            match state.recents.record(&action, &prompt, &data).await {
                Ok(_) => send_recents_snapshot(socket, state).await,
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "Failed to persist recent action")
                }
            }

            let outcome = session.submit_action(&prompt).await;
            send_outcome(socket, outcome).await;
        }
        ClientEvent::Clear => {
            let session_id = session.clear().await;
            send_event(socket, &ServerEvent::Cleared { session_id }).await;
        }
        ClientEvent::ClearRecents => match state.recents.clear().await {
            Ok(()) => send_recents_snapshot(socket, state).await,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to clear recent actions");
                send_event(
                    socket,
                    &ServerEvent::StatusUpdate {
                        status: "recents_error".to_string(),
                        details: Some(e.to_string()),
                    },
                )
                .await;
            }
        },
        ClientEvent::SetMockMode { enabled } => {
            session.set_mock_mode(enabled).await;
            send_event(
                socket,
                &ServerEvent::StatusUpdate {
                    status: "mock_mode".to_string(),
                    details: Some(enabled.to_string()),
                },
            )
            .await;
        }
    }
}

async fn send_outcome(socket: &mut WebSocket, outcome: SubmitOutcome) {
    if outcome.endpoint_warning {
        send_event(
            socket,
            &ServerEvent::StatusUpdate {
                status: "endpoint_not_configured".to_string(),
                details: Some(ENDPOINT_WARNING_TEXT.to_string()),
            },
        )
        .await;
    }
    for message in outcome.messages {
        send_event(socket, &ServerEvent::Message { message }).await;
    }
}

async fn send_recents_snapshot(socket: &mut WebSocket, state: &Arc<ApiState>) {
    let actions = state
        .recents
        .visible()
        .await
        .iter()
        .map(RecentActionView::from_entry)
        .collect();
    send_event(socket, &ServerEvent::RecentActions { actions }).await;
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) {
    let json = serde_json::to_string(event).unwrap_or_else(|_| {
        "{\"type\":\"status_update\",\"status\":\"serialization_error\"}".to_string()
    });
    let _ = socket.send(Message::Text(json)).await;
}
