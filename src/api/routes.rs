//! API route handlers.
//!
//! All endpoints return JSON. The engine is shared via `Arc<ApiState>` and
//! guarded by an `RwLock`; every mutating handler holds the write lock for
//! its whole read-modify-write so concurrent adjusts cannot interleave.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::engine::PrivacyEngine;
use crate::types::{
    Decision, HistoryEntry, PgeError, PrivacyLevelConfig, PrivacyMode, RiskSignals,
    RiskSignalsPatch,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub engine: RwLock<PrivacyEngine>,
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(engine: PrivacyEngine) -> Self {
        Self {
            engine: RwLock::new(engine),
            started_at: Utc::now(),
        }
    }
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Current configuration, tagged with its mode.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    pub mode: PrivacyMode,
    #[serde(flatten)]
    pub config: PrivacyLevelConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeEntry {
    pub mode: PrivacyMode,
    pub description: &'static str,
    #[serde(flatten)]
    pub config: PrivacyLevelConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModesResponse {
    pub modes: Vec<ModeEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub current_mode: Option<PrivacyMode>,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error returned by handlers; rendered as `{"error": {code, message}}`.
#[derive(Debug)]
pub enum ApiError {
    Engine(PgeError),
    /// Body failed to deserialize because of an unknown preference token.
    InvalidPreference(String),
    BadRequest(String),
}

impl From<PgeError> for ApiError {
    fn from(err: PgeError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        match rejection {
            // `UserPreference` parses through `FromStr`, so its error text
            // survives inside the serde message.
            JsonRejection::JsonDataError(_) if message.contains(PREFERENCE_ERROR_PREFIX) => {
                ApiError::InvalidPreference(message)
            }
            _ => ApiError::BadRequest(message),
        }
    }
}

const PREFERENCE_ERROR_PREFIX: &str = "Invalid preference:";

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Engine(PgeError::InvalidSignal { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_SIGNAL")
            }
            ApiError::Engine(PgeError::InvalidPreference(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_PREFERENCE")
            }
            ApiError::Engine(PgeError::UnknownMode(_)) => (StatusCode::BAD_REQUEST, "UNKNOWN_MODE"),
            ApiError::Engine(PgeError::NotConfigured) => (StatusCode::NOT_FOUND, "NOT_CONFIGURED"),
            ApiError::Engine(PgeError::InvalidRegistry(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_REGISTRY")
            }
            ApiError::InvalidPreference(_) => (StatusCode::BAD_REQUEST, "INVALID_PREFERENCE"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Engine(e) => e.to_string(),
            ApiError::InvalidPreference(msg) | ApiError::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.message();
        warn!(status = status.as_u16(), code, error = %message, "Request rejected");
        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "Privacy Gradient Engine",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// POST /privacy/select-mode
pub async fn select_mode(
    State(state): State<AppState>,
    payload: Result<Json<RiskSignals>, JsonRejection>,
) -> Result<Json<Decision>, ApiError> {
    let Json(signals) = payload?;
    let mut engine = state.engine.write().await;
    let decision = engine.select_mode(signals)?;
    Ok(Json(decision))
}

/// GET /privacy/current-config
pub async fn current_config(
    State(state): State<AppState>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let engine = state.engine.read().await;
    let config = *engine.get_privacy_config()?;
    let mode = engine.current_mode().ok_or(PgeError::NotConfigured)?;
    Ok(Json(ConfigResponse { mode, config }))
}

/// POST /privacy/adjust
pub async fn adjust(
    State(state): State<AppState>,
    payload: Result<Json<RiskSignalsPatch>, JsonRejection>,
) -> Result<Json<Decision>, ApiError> {
    let Json(patch) = payload?;
    let mut engine = state.engine.write().await;
    let decision = engine.adjust_with_patch(&patch)?;
    Ok(Json(decision))
}

/// POST /privacy/reset
pub async fn reset(State(state): State<AppState>) -> Json<Decision> {
    let mut engine = state.engine.write().await;
    Json(engine.reset())
}

/// GET /privacy/modes
pub async fn modes(State(state): State<AppState>) -> Json<ModesResponse> {
    let engine = state.engine.read().await;
    let modes = engine
        .registry()
        .all()
        .iter()
        .map(|(mode, config)| ModeEntry {
            mode: *mode,
            description: mode.description(),
            config: *config,
        })
        .collect();
    Json(ModesResponse { modes })
}

/// GET /privacy/history
pub async fn history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let engine = state.engine.read().await;
    Json(HistoryResponse {
        session_id: engine.session().id,
        current_mode: engine.current_mode(),
        entries: engine.history(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
