//! HTTP/JSON surface over the task queue, the scanner and chat.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;
use wt_queue::{TaskQueue, TaskSpec};

use crate::chat::ChatOrchestrator;
use crate::scanner::ScanOrchestrator;

/// Priority of scans requested over the API.
pub const MANUAL_SCAN_PRIORITY: i32 = 9;

/// Shared state for all handlers.
pub struct ApiState {
    pub queue: Arc<TaskQueue>,
    pub scanner: Arc<ScanOrchestrator>,
    pub chat: Arc<ChatOrchestrator>,
}

impl ApiState {
    pub fn new(
        queue: Arc<TaskQueue>,
        scanner: Arc<ScanOrchestrator>,
        chat: Arc<ChatOrchestrator>,
    ) -> Self {
        Self {
            queue,
            scanner,
            chat,
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        // Chat
        .route("/api/chat", post(chat))
        .route("/api/chat/sessions", post(create_session))
        .route("/api/chat/sessions/{id}/messages", get(session_messages))
        .route(
            "/api/chat/sessions/{id}",
            axum::routing::delete(delete_session),
        )
        .route("/api/chat/stats", get(chat_stats))
        // Scans
        .route("/api/scan", post(trigger_scan))
        .route("/api/report", get(latest_report))
        // Task queue
        .route("/api/tasks/history", get(task_history))
        .route("/api/tasks/stats", get(task_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn chat(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "message is required"})),
        );
    }
    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let reply = state.chat.process_message(&session_id, &req.message).await;
    (
        StatusCode::OK,
        Json(json!({
            "session_id": session_id,
            "reply": reply.content,
            "timestamp": reply.timestamp,
        })),
    )
}

async fn create_session(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let conversation = state.chat.start(&session_id).await;
    (StatusCode::CREATED, Json(json!(conversation)))
}

async fn session_messages(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    Json(json!(state.chat.history(&id).await))
}

async fn delete_session(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if state.chat.clear(&id).await {
        (StatusCode::OK, Json(json!({"deleted": true})))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "session not found"})),
        )
    }
}

async fn chat_stats(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(json!({"active_sessions": state.chat.active_count().await}))
}

async fn trigger_scan(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let task_id = format!("manual-scan-{}", Uuid::new_v4());
    let scanner = state.scanner.clone();
    let spec = TaskSpec::new(&task_id, "manual-scan")
        .priority(MANUAL_SCAN_PRIORITY)
        .action(move || {
            let scanner = scanner.clone();
            async move {
                let report = scanner.perform_scan().await?;
                Ok(json!({
                    "report_id": report.id,
                    "issues": report.issue_count(),
                }))
            }
        });

    match state.queue.submit(spec).await {
        Ok(task) => {
            info!(task_id = %task.id, "manual scan queued");
            tokio::spawn(drain_queue(state.queue.clone()));
            (StatusCode::ACCEPTED, Json(json!({"task_id": task.id})))
        }
        Err(e) => {
            warn!(error = %e, "manual scan rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}

/// Run the queue until nothing is pending, waiting out a concurrent run.
async fn drain_queue(queue: Arc<TaskQueue>) {
    loop {
        queue.run_all().await;
        if queue.pending().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

async fn latest_report(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match state.scanner.get_last().await {
        Some(report) => (StatusCode::OK, Json(json!(report.as_ref()))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "no scan has completed yet"})),
        ),
    }
}

async fn task_history(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(json!(state.queue.history().await))
}

async fn task_stats(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(json!(state.queue.stats().await))
}
