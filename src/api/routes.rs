use axum::routing::{get, post, put};
use axum::Router;

use super::handlers::{
    command_exists, create_profile, delete_profile, get_codex_settings, latency, list_profiles,
    probe, public_ip, put_codex_settings, set_active, system_env, update_profile, AppState,
};

/// 创建 API 路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/probe", post(probe))
        .route("/api/v1/latency", post(latency))
        .route("/api/v1/public-ip", post(public_ip))
        .route("/api/v1/commands/{name}", get(command_exists))
        .route("/api/v1/system-env", get(system_env))
        .route(
            "/api/v1/codex/settings",
            get(get_codex_settings).put(put_codex_settings),
        )
        .route(
            "/api/v1/{namespace}/profiles",
            get(list_profiles).post(create_profile),
        )
        .route(
            "/api/v1/{namespace}/profiles/{id}",
            put(update_profile).delete(delete_profile),
        )
        .route("/api/v1/{namespace}/active", put(set_active))
        .with_state(state)
}
