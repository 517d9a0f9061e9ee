//! Plugin management endpoints

use crate::dto::{InstallRequest, MessageDto, PluginDescriptorDto, PluginInfoDto};
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use pdbp_core::PluginConfig;
use tracing::info;

const INSTALL_HINT: &str = "POST /api/plugins/install";

pub fn plugin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/plugins", get(list_plugins))
        .route("/api/plugins/discover", get(discover_plugins))
        .route("/api/plugins/install", post(install_plugin))
        .route("/api/plugins/{name}", get(get_plugin).delete(unload_plugin))
        .route("/api/plugins/{name}/start", post(start_plugin))
        .route("/api/plugins/{name}/stop", post(stop_plugin))
        .route(
            "/api/plugins/{name}/config",
            get(get_plugin_config).put(update_plugin_config),
        )
}

/// 알 수 없는 경로
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Resource not found: {}", uri.path()))
}

// ============================================================================
// Queries
// ============================================================================

async fn list_plugins(State(state): State<AppState>) -> ApiResult<Json<Vec<PluginInfoDto>>> {
    let names = state
        .service
        .list_plugins()
        .await
        .map_err(ApiError::internal)?;

    let mut plugins = Vec::with_capacity(names.len());
    for name in names {
        // 목록 조회와 정보 조회 사이에 언로드될 수 있음
        let info = match state.service.get_plugin_info(&name).await {
            Ok(record) => PluginInfoDto::from(record),
            Err(_) => PluginInfoDto::unknown(name),
        };
        plugins.push(info);
    }
    Ok(Json(plugins))
}

async fn discover_plugins(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<PluginDescriptorDto>>> {
    let descriptors = state
        .service
        .discover_plugins()
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(
        descriptors.into_iter().map(PluginDescriptorDto::from).collect(),
    ))
}

async fn get_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PluginInfoDto>> {
    let record = state.service.get_plugin_info(&name).await?;
    Ok(Json(record.into()))
}

async fn get_plugin_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PluginConfig>> {
    Ok(Json(state.service.get_plugin_config(&name).await?))
}

// ============================================================================
// Commands
// ============================================================================

async fn install_plugin(
    State(state): State<AppState>,
    payload: Result<Json<InstallRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PluginInfoDto>)> {
    let Json(request) = payload?;
    let (name, artifact, entry_point) = request.required_fields().ok_or_else(|| {
        ApiError::BadRequest("Missing required fields: pluginName, jarPath, className".into())
    })?;

    let record = state
        .service
        .install_plugin(name, artifact, entry_point)
        .await?;
    info!("Installed plugin {} via API", record.name);

    Ok((StatusCode::CREATED, Json(record.into())))
}

async fn start_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PluginInfoDto>> {
    match state.service.start_plugin(&name).await {
        Ok(record) => Ok(Json(record.into())),
        Err(err) if err.is_not_found() => Err(not_installed(&state, &name, true).await),
        Err(err) => Err(err.into()),
    }
}

async fn stop_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PluginInfoDto>> {
    match state.service.stop_plugin(&name).await {
        Ok(record) => Ok(Json(record.into())),
        Err(err) if err.is_not_found() => Err(not_installed(&state, &name, false).await),
        Err(err) => Err(err.into()),
    }
}

async fn unload_plugin(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<MessageDto>> {
    match state.service.unload_plugin(&name).await {
        Ok(()) => Ok(Json(MessageDto {
            message: format!("Plugin unloaded: {}", name),
        })),
        Err(err) if err.is_not_found() => Err(not_installed(&state, &name, false).await),
        Err(err) => Err(err.into()),
    }
}

async fn update_plugin_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<PluginConfig>, JsonRejection>,
) -> ApiResult<Json<PluginConfig>> {
    let Json(changes) = payload?;
    let config = state.service.update_plugin_config(&name, changes).await?;
    Ok(Json(config))
}

// ============================================================================
// Helpers
// ============================================================================

/// 설치된 플러그인 목록을 포함한 404
async fn not_installed(state: &AppState, name: &str, with_hint: bool) -> ApiError {
    let available = match state.service.list_plugins().await {
        Ok(names) => names,
        Err(err) => return ApiError::from(err),
    };
    ApiError::NotFound(not_installed_message(name, &available, with_hint))
}

fn not_installed_message(name: &str, available: &[String], with_hint: bool) -> String {
    match (with_hint, available.is_empty()) {
        (true, true) => format!(
            "Plugin not found: {}. No plugins installed. Install a plugin first: {}",
            name, INSTALL_HINT
        ),
        (true, false) => format!(
            "Plugin not found: {}. Available plugins: [{}]. Install the plugin first: {}",
            name,
            available.join(", "),
            INSTALL_HINT
        ),
        (false, _) => format!(
            "Plugin not found: {}. Available plugins: [{}]",
            name,
            available.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_installed_messages() {
        assert_eq!(
            not_installed_message("ghost", &[], true),
            "Plugin not found: ghost. No plugins installed. Install a plugin first: POST /api/plugins/install"
        );
        assert_eq!(
            not_installed_message("ghost", &["a".into(), "b".into()], true),
            "Plugin not found: ghost. Available plugins: [a, b]. Install the plugin first: POST /api/plugins/install"
        );
        assert_eq!(
            not_installed_message("ghost", &["a".into()], false),
            "Plugin not found: ghost. Available plugins: [a]"
        );
    }
}
