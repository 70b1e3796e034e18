//! REST API Server for the SafeSentinel console
//!
//! Exposes conversation sessions and single-shot resolution over HTTP

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::ResolutionLog;
use crate::conversation::{state::validate_query, Conversation, SubmitOutcome, SubmitRejection};
use crate::gateway::Transport;
use crate::models::Mode;
use crate::pipeline::Pipelines;
use crate::projector;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub chat_id: Option<String>,
    pub text: String,
    /// Pins the session before this turn; same values as the mode endpoint
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    /// `null` or `"auto"` unpins the session
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub mode: String,
    pub query: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn fail(status: StatusCode, message: impl Into<String>) -> ApiResult {
    (status, Json(ApiResponse::error(message.into())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pipelines: Arc<Pipelines>,
    log: Arc<ResolutionLog>,
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Conversation>>>>,
}

impl ApiState {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            pipelines: Arc::new(Pipelines::new(transport)),
            log: Arc::new(ResolutionLog::new()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn existing(&self, session_id: Uuid) -> Option<Arc<Conversation>> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    async fn session(&self, session_id: Uuid) -> Arc<Conversation> {
        if let Some(conversation) = self.existing(session_id).await {
            return conversation;
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_insert_with(|| {
                info!(%session_id, "Session opened");
                Arc::new(Conversation::new(
                    session_id,
                    self.pipelines.clone(),
                    self.log.clone(),
                ))
            })
            .clone()
    }
}

/// =============================
/// Helpers: Session Ids
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Real UUIDs pass through, anything else maps to a stable derived id
fn session_id_from(value: &str) -> Uuid {
    Uuid::parse_str(value).unwrap_or_else(|_| stable_uuid_from_string(value))
}

fn parse_mode(raw: Option<&str>) -> Result<Option<Mode>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(m) if m.eq_ignore_ascii_case("auto") => Ok(None),
        Some(m) => m.parse::<Mode>().map(Some),
    }
}

fn rejection_status(rejection: SubmitRejection) -> StatusCode {
    match rejection {
        SubmitRejection::Pending => StatusCode::CONFLICT,
        SubmitRejection::TooShort | SubmitRejection::TooLong => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> ApiResult {
    // Sessions are only opened for submissions that can be accepted.
    if let Err(rejection) = validate_query(&req.text) {
        return fail(rejection_status(rejection), rejection.to_string());
    }
    let pinned = match req.mode.as_deref() {
        Some(raw) => match parse_mode(Some(raw)) {
            Ok(mode) => Some(mode),
            Err(e) => return fail(StatusCode::UNPROCESSABLE_ENTITY, e),
        },
        None => None,
    };

    let session_id = match req.chat_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => session_id_from(id),
        _ => Uuid::new_v4(),
    };
    let conversation = state.session(session_id).await;
    if let Some(mode) = pinned {
        conversation.set_mode(mode).await;
    }

    // Runs detached so the turn completes even if the client goes away.
    let text = req.text;
    let task = tokio::spawn(async move { conversation.submit(&text).await });

    match task.await {
        Ok(SubmitOutcome::Replied(turn)) => ok(serde_json::json!({
            "chat_id": session_id.to_string(),
            "turn": turn,
        })),
        Ok(SubmitOutcome::Rejected(rejection)) => {
            warn!(%session_id, %rejection, "Chat submission rejected");
            fail(rejection_status(rejection), rejection.to_string())
        }
        Err(e) => {
            error!(%session_id, error = %e, "Chat task failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, "chat task failed")
        }
    }
}

/// =============================
/// Session Endpoints
/// =============================

async fn transcript_handler(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    match state.existing(session_id_from(&id)).await {
        Some(conversation) => ok(conversation.snapshot().await),
        None => fail(StatusCode::NOT_FOUND, format!("unknown session '{}'", id)),
    }
}

async fn mode_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<ModeRequest>,
) -> ApiResult {
    let mode = match parse_mode(req.mode.as_deref()) {
        Ok(mode) => mode,
        Err(e) => return fail(StatusCode::UNPROCESSABLE_ENTITY, e),
    };

    let session_id = session_id_from(&id);
    let Some(conversation) = state.existing(session_id).await else {
        return fail(StatusCode::NOT_FOUND, format!("unknown session '{}'", id));
    };
    conversation.set_mode(mode).await;

    ok(serde_json::json!({
        "chat_id": session_id.to_string(),
        "mode": mode,
    }))
}

async fn resolutions_handler(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let session_id = session_id_from(&id);
    if state.existing(session_id).await.is_none() {
        return fail(StatusCode::NOT_FOUND, format!("unknown session '{}'", id));
    }

    ok(state.log.list_for_session(session_id).await)
}

/// =============================
/// Single-shot Resolution
/// =============================

async fn resolve_handler(State(state): State<ApiState>, Json(req): Json<ResolveRequest>) -> ApiResult {
    let mode = match req.mode.parse::<Mode>() {
        Ok(mode) => mode,
        Err(e) => return fail(StatusCode::UNPROCESSABLE_ENTITY, e),
    };
    let query = match validate_query(&req.query) {
        Ok(query) => query,
        Err(rejection) => return fail(rejection_status(rejection), rejection.to_string()),
    };

    info!(%mode, "Single-shot resolution");

    match state.pipelines.resolve(mode, query).await {
        Ok(output) => ok(projector::project(&output)),
        Err(e) => {
            warn!(error = %e, "Single-shot resolution failed");
            fail(StatusCode::BAD_GATEWAY, format!("{}: {}", e.code(), e))
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/resolve", post(resolve_handler))
        .route("/api/sessions/:id/transcript", get(transcript_handler))
        .route("/api/sessions/:id/mode", post(mode_handler))
        .route("/api/sessions/:id/resolutions", get(resolutions_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(state: ApiState, port: u16) -> crate::Result<()> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
