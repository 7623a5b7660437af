use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::SwitchError;
use crate::models::{CodexGlobalSettings, ConfigProfile, ConnectionStatus, Namespace, SystemEnvConfig};

/// 共享状态类型
pub type AppState = Arc<dyn Backend>;

// ---- 请求 / 响应结构体 ----

#[derive(Deserialize)]
pub struct ProfileBody {
    pub title: String,
    #[serde(default = "empty_settings")]
    pub settings: serde_json::Value,
}

fn empty_settings() -> serde_json::Value {
    serde_json::json!({})
}

#[derive(Deserialize)]
pub struct ActiveBody {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Deserialize)]
pub struct ProbeBody {
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Deserialize)]
pub struct LatencyBody {
    pub url: String,
}

#[derive(Serialize, Deserialize)]
pub struct LatencyResponse {
    pub url: String,
    pub latency_ms: u64,
}

#[derive(Deserialize)]
pub struct PublicIpBody {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicIpResponse {
    pub ip: String,
}

#[derive(Serialize, Deserialize)]
pub struct CommandResponse {
    pub command: String,
    pub installed: bool,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---- SwitchError -> HTTP Response ----

impl IntoResponse for SwitchError {
    fn into_response(self) -> Response {
        let status = match &self {
            SwitchError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            SwitchError::Validation(_) => StatusCode::BAD_REQUEST,
            SwitchError::FeatureDisabled(_) | SwitchError::ActivationPending(_) => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---- 处理器 ----

/// GET /api/v1/{namespace}/profiles
pub async fn list_profiles(
    State(backend): State<AppState>,
    Path(ns): Path<Namespace>,
) -> Result<Json<Vec<ConfigProfile>>, SwitchError> {
    Ok(Json(backend.list_profiles(ns).await?))
}

/// POST /api/v1/{namespace}/profiles
pub async fn create_profile(
    State(backend): State<AppState>,
    Path(ns): Path<Namespace>,
    Json(body): Json<ProfileBody>,
) -> Result<(StatusCode, Json<ConfigProfile>), SwitchError> {
    let created = backend.create_profile(ns, &body.title, body.settings).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/{namespace}/profiles/{id}
pub async fn update_profile(
    State(backend): State<AppState>,
    Path((ns, id)): Path<(Namespace, String)>,
    Json(body): Json<ProfileBody>,
) -> Result<Json<ConfigProfile>, SwitchError> {
    Ok(Json(
        backend.update_profile(ns, &id, &body.title, body.settings).await?,
    ))
}

/// DELETE /api/v1/{namespace}/profiles/{id}
pub async fn delete_profile(
    State(backend): State<AppState>,
    Path((ns, id)): Path<(Namespace, String)>,
) -> Result<StatusCode, SwitchError> {
    backend.delete_profile(ns, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/{namespace}/active，返回切换后的列表
pub async fn set_active(
    State(backend): State<AppState>,
    Path(ns): Path<Namespace>,
    Json(body): Json<ActiveBody>,
) -> Result<Json<Vec<ConfigProfile>>, SwitchError> {
    backend.set_active_profile(ns, body.id.as_deref()).await?;
    Ok(Json(backend.list_profiles(ns).await?))
}

/// POST /api/v1/probe
pub async fn probe(
    State(backend): State<AppState>,
    Json(body): Json<ProbeBody>,
) -> Result<Json<ConnectionStatus>, SwitchError> {
    Ok(Json(
        backend
            .probe_connection(&body.url, &body.api_key, &body.model)
            .await?,
    ))
}

/// POST /api/v1/latency
pub async fn latency(
    State(backend): State<AppState>,
    Json(body): Json<LatencyBody>,
) -> Result<Json<LatencyResponse>, SwitchError> {
    let latency_ms = backend.check_site_latency(&body.url).await?;
    Ok(Json(LatencyResponse {
        url: body.url,
        latency_ms,
    }))
}

/// POST /api/v1/public-ip
pub async fn public_ip(
    State(backend): State<AppState>,
    Json(body): Json<PublicIpBody>,
) -> Result<Json<PublicIpResponse>, SwitchError> {
    let ip = backend.public_ip(&body.url).await?;
    Ok(Json(PublicIpResponse { ip }))
}

/// GET /api/v1/commands/{name}
pub async fn command_exists(
    State(backend): State<AppState>,
    Path(command): Path<String>,
) -> Result<Json<CommandResponse>, SwitchError> {
    let installed = backend.command_exists(&command).await?;
    Ok(Json(CommandResponse { command, installed }))
}

/// GET /api/v1/system-env
pub async fn system_env(
    State(backend): State<AppState>,
) -> Result<Json<SystemEnvConfig>, SwitchError> {
    Ok(Json(backend.system_env_config().await?))
}

/// GET /api/v1/codex/settings
pub async fn get_codex_settings(
    State(backend): State<AppState>,
) -> Result<Json<CodexGlobalSettings>, SwitchError> {
    Ok(Json(backend.codex_global_settings().await?))
}

/// PUT /api/v1/codex/settings
pub async fn put_codex_settings(
    State(backend): State<AppState>,
    Json(settings): Json<CodexGlobalSettings>,
) -> Result<Json<CodexGlobalSettings>, SwitchError> {
    backend.update_codex_global_settings(settings).await?;
    Ok(Json(backend.codex_global_settings().await?))
}
