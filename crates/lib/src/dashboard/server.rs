//! Dashboard HTTP server.

use crate::config::Config;
use crate::dashboard::store::{
    ChatMessage, ConversationMessage, InMemoryMessageRepository, MessageIds, MessageRepository,
    MessageScope, NewMessage,
};
use crate::roster;
use crate::runtime::shutdown_signal;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared state for the dashboard routes.
#[derive(Clone)]
pub struct DashboardState {
    /// Reported by the health probe.
    pub port: u16,
    pub messages: Arc<dyn MessageRepository>,
    pub ids: Arc<MessageIds>,
}

impl DashboardState {
    pub fn new(port: u16, messages: Arc<dyn MessageRepository>) -> Self {
        Self {
            port,
            messages,
            ids: Arc::new(MessageIds::new()),
        }
    }

    /// State backed by a fresh in-memory repository.
    pub fn in_memory(port: u16) -> Self {
        Self::new(port, Arc::new(InMemoryMessageRepository::new()))
    }

    async fn append(&self, scope: MessageScope, new: NewMessage) -> ChatMessage {
        let message = ChatMessage::from_new(new, self.ids.next());
        self.messages.append(&scope, message.clone()).await;
        message
    }
}

/// All dashboard routes. `/api/messages/global` takes priority over the conversation route.
pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/api/agents", get(list_agents))
        .route("/api/agents/:id/start", post(start_agent))
        .route("/api/messages/global", get(list_global).post(post_global))
        .route(
            "/api/messages/:conversation_id",
            get(list_conversation).post(post_conversation),
        )
        .with_state(state)
}

/// Run the dashboard on config.dashboard.bind:config.dashboard.port until SIGINT/SIGTERM.
pub async fn run_dashboard(config: Config) -> Result<()> {
    let bind_addr = format!("{}:{}", config.dashboard.bind.trim(), config.dashboard.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("dashboard listening on {}", bind_addr);
    let state = DashboardState::in_memory(config.dashboard.port);
    serve(listener, state, shutdown_signal()).await?;
    log::info!("dashboard stopped");
    Ok(())
}

/// Serve the dashboard on an already bound listener until `shutdown` completes.
pub async fn serve<F>(listener: TcpListener, state: DashboardState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("dashboard server exited")
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<DashboardState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}

/// GET /api/agents — the fixed roster.
async fn list_agents() -> Json<serde_json::Value> {
    Json(json!({ "agents": roster::roster() }))
}

/// POST /api/agents/:id/start — acknowledged for any id; nothing is started.
async fn start_agent(Path(id): Path<String>) -> Json<serde_json::Value> {
    log::info!("start request received for agent: {}", id);
    Json(json!({ "success": true, "id": id }))
}

async fn list_global(State(state): State<DashboardState>) -> Json<serde_json::Value> {
    let messages = state.messages.list(&MessageScope::Global).await;
    Json(json!({ "messages": messages }))
}

async fn post_global(
    State(state): State<DashboardState>,
    Json(new): Json<NewMessage>,
) -> Json<serde_json::Value> {
    let message = state.append(MessageScope::Global, new).await;
    Json(json!({ "message": message }))
}

async fn list_conversation(
    State(state): State<DashboardState>,
    Path(conversation_id): Path<String>,
) -> Json<serde_json::Value> {
    let messages = state
        .messages
        .list(&MessageScope::Conversation(conversation_id))
        .await;
    let records: Vec<ConversationMessage> =
        messages.iter().map(ConversationMessage::from).collect();
    Json(json!({ "messages": records }))
}

async fn post_conversation(
    State(state): State<DashboardState>,
    Path(conversation_id): Path<String>,
    Json(new): Json<NewMessage>,
) -> Json<serde_json::Value> {
    log::debug!("dashboard: message posted to conversation {}", conversation_id);
    let message = state
        .append(MessageScope::Conversation(conversation_id), new)
        .await;
    Json(json!({ "message": ConversationMessage::from(&message) }))
}
