//! Server bootstrap - 라우터 조립 및 바인딩

use crate::middleware::track_metrics;
use crate::routes::{health_routes, metrics_routes, not_found, plugin_routes};
use axum::{middleware, Router};
use pdbp_core::PluginService;
use pdbp_foundation::{Error, Result, ServerConfig};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// 핸들러 공유 상태
///
/// HTTP 레이어는 서비스 트레이트에만 의존합니다.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn PluginService>,
}

impl AppState {
    pub fn new(service: Arc<dyn PluginService>) -> Self {
        Self { service }
    }
}

/// 전체 라우터 (테스트에서 직접 `oneshot` 가능)
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(plugin_routes())
        .merge(metrics_routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 설정된 주소에 바인딩하고 `shutdown` 이 완료될 때까지 서비스
pub async fn serve<F>(config: &ServerConfig, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid address {}: {}", config.bind_address(), e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting PDBP server on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
