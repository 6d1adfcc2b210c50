use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use benor_common::{Message, NodeState, NodeStatus, Result};

use crate::runtime::{consensus_driver::StartOutcome, node::NodeRuntime};

#[derive(Clone)]
pub struct AppState {
    pub node: Arc<NodeRuntime>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_api))
        .route("/start", get(start_api))
        .route("/stop", get(stop_api))
        .route("/getState", get(get_state_api))
        .route("/message", post(message_api))
        .with_state(state)
}

/// Serves on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!("REST API for {} listening on {}", state.node.node_id(), listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn status_api(State(state): State<AppState>) -> (StatusCode, String) {
    match state.node.status() {
        NodeStatus::Live => (StatusCode::OK, NodeStatus::Live.to_string()),
        NodeStatus::Faulty => (StatusCode::INTERNAL_SERVER_ERROR, NodeStatus::Faulty.to_string()),
    }
}

async fn start_api(State(state): State<AppState>) -> (StatusCode, String) {
    match state.node.start().await {
        Ok(StartOutcome::Started) => (StatusCode::OK, "consensus started".to_string()),
        Ok(StartOutcome::AlreadyRunning) => (StatusCode::OK, "consensus already running".to_string()),
        Ok(StartOutcome::Faulty) => (StatusCode::OK, "faulty node, not taking part".to_string()),
        Ok(StartOutcome::Stopped) => (StatusCode::CONFLICT, "node is stopped".to_string()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn stop_api(State(state): State<AppState>) -> (StatusCode, String) {
    state.node.stop().await;
    (StatusCode::OK, "node stopped".to_string())
}

async fn get_state_api(State(state): State<AppState>) -> Json<NodeState> {
    Json(state.node.state().await)
}

async fn message_api(State(state): State<AppState>, body: String) -> (StatusCode, String) {
    let msg = match Message::from_json(&body) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("[{}] rejected message {}: {}", state.node.node_id(), body, e);
            return (StatusCode::BAD_REQUEST, e.to_string());
        }
    };
    state.node.handle_message(msg).await;
    (StatusCode::OK, "message received".to_string())
}
