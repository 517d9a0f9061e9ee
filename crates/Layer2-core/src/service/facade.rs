//! Plugin Service - HTTP 레이어가 의존하는 작업 단위 계약
//!
//! 모든 실패는 `PluginOperationError` 하나로 보고되며 원래 원인을 보존합니다.

use super::metrics::{ApiMetrics, MetricsSnapshot};
use crate::plugin::{
    DiscoveryScanner, LifecycleManager, PluginConfig, PluginDescriptor, PluginRecord,
};
use async_trait::async_trait;
use pdbp_foundation::{Error, PluginState};
use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// 서비스 Result 타입
pub type ServiceResult<T> = std::result::Result<T, PluginOperationError>;

// ============================================================================
// PluginOperationError
// ============================================================================

/// 서비스 작업 실패
#[derive(Debug, thiserror::Error)]
#[error("Failed to {operation} {subject}: {cause}")]
pub struct PluginOperationError {
    /// 작업 이름 (install, start, ...)
    pub operation: String,

    /// 대상 ("plugin echo", "plugins")
    pub subject: String,

    #[source]
    pub cause: Error,
}

impl PluginOperationError {
    /// 특정 플러그인 작업 실패
    pub fn new(operation: impl Into<String>, plugin: &str, cause: Error) -> Self {
        Self {
            operation: operation.into(),
            subject: format!("plugin {}", plugin),
            cause,
        }
    }

    /// 플러그인 전체 대상 작업 실패 (list, discover)
    pub fn for_all(operation: impl Into<String>, cause: Error) -> Self {
        Self {
            operation: operation.into(),
            subject: "plugins".to_string(),
            cause,
        }
    }

    pub fn cause(&self) -> &Error {
        &self.cause
    }

    pub fn is_not_found(&self) -> bool {
        self.cause.is_not_found()
    }

    pub fn is_internal(&self) -> bool {
        self.cause.is_internal()
    }

    /// 원인 체인의 가장 안쪽 메시지
    pub fn root_message(&self) -> String {
        let mut current: &dyn StdError = &self.cause;
        while let Some(source) = current.source() {
            current = source;
        }
        current.to_string()
    }
}

// ============================================================================
// PluginService Trait
// ============================================================================

/// 플러그인 서비스 트레이트
///
/// HTTP 레이어는 이 트레이트에만 의존합니다 (mock 구현 가능).
#[async_trait]
pub trait PluginService: Send + Sync {
    /// 설치된 플러그인 이름 목록
    async fn list_plugins(&self) -> ServiceResult<Vec<String>>;

    /// 플러그인 정보 (없으면 NotFound)
    async fn get_plugin_info(&self, name: &str) -> ServiceResult<PluginRecord>;

    /// 플러그인 디렉토리 스캔
    async fn discover_plugins(&self) -> ServiceResult<Vec<PluginDescriptor>>;

    async fn install_plugin(
        &self,
        name: &str,
        artifact_path: &str,
        entry_point: &str,
    ) -> ServiceResult<PluginRecord>;

    async fn start_plugin(&self, name: &str) -> ServiceResult<PluginRecord>;

    async fn stop_plugin(&self, name: &str) -> ServiceResult<PluginRecord>;

    async fn unload_plugin(&self, name: &str) -> ServiceResult<()>;

    async fn get_plugin_config(&self, name: &str) -> ServiceResult<PluginConfig>;

    /// 설정 병합 후 전체 설정 반환
    async fn update_plugin_config(
        &self,
        name: &str,
        config: PluginConfig,
    ) -> ServiceResult<PluginConfig>;

    /// 엔드포인트 요청 카운트
    fn record_api_request(&self, endpoint: &str);

    /// 엔드포인트 에러 카운트
    fn record_api_error(&self, endpoint: &str);

    /// 카운터 + 레지스트리 스냅샷
    fn get_metrics(&self) -> MetricsSnapshot;
}

// ============================================================================
// DefaultPluginService
// ============================================================================

/// 라이프사이클 매니저 + 디스커버리 기반 기본 구현
pub struct DefaultPluginService {
    lifecycle: Arc<LifecycleManager>,
    discovery: DiscoveryScanner,
    metrics: ApiMetrics,
}

impl DefaultPluginService {
    pub fn new(lifecycle: Arc<LifecycleManager>, discovery: DiscoveryScanner) -> Self {
        Self {
            lifecycle,
            discovery,
            metrics: ApiMetrics::new(),
        }
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleManager> {
        &self.lifecycle
    }
}

/// 슬롯 잠금 안에서 레코드가 없었던 경우를 `NotFound`로 통일
fn absent_as_not_found(name: &str, err: Error) -> Error {
    match err {
        Error::InvalidState {
            state: PluginState::Uninstalled,
            ..
        } => Error::NotFound(name.to_string()),
        other => other,
    }
}

#[async_trait]
impl PluginService for DefaultPluginService {
    async fn list_plugins(&self) -> ServiceResult<Vec<String>> {
        let mut names: Vec<String> = self.lifecycle.registry().list().collect();
        names.sort();
        Ok(names)
    }

    async fn get_plugin_info(&self, name: &str) -> ServiceResult<PluginRecord> {
        self.lifecycle
            .get(name)
            .map_err(|e| PluginOperationError::new("get", name, e))
    }

    async fn discover_plugins(&self) -> ServiceResult<Vec<PluginDescriptor>> {
        let scanner = self.discovery.clone();
        let report = tokio::task::spawn_blocking(move || scanner.discover())
            .await
            .map_err(|e| {
                PluginOperationError::for_all(
                    "discover",
                    Error::Internal(format!("Discovery task failed: {}", e)),
                )
            })?;

        if report.skipped > 0 {
            info!(
                "Discovery skipped {} malformed artifacts in {}",
                report.skipped,
                self.discovery.directory().display()
            );
        }
        Ok(report.descriptors)
    }

    async fn install_plugin(
        &self,
        name: &str,
        artifact_path: &str,
        entry_point: &str,
    ) -> ServiceResult<PluginRecord> {
        debug!("Service: install {} ({}, {})", name, artifact_path, entry_point);
        self.lifecycle
            .install(name, PathBuf::from(artifact_path), entry_point)
            .await
            .map_err(|e| PluginOperationError::new("install", name, e))
    }

    async fn start_plugin(&self, name: &str) -> ServiceResult<PluginRecord> {
        self.lifecycle
            .start(name)
            .await
            .map_err(|e| PluginOperationError::new("start", name, absent_as_not_found(name, e)))
    }

    async fn stop_plugin(&self, name: &str) -> ServiceResult<PluginRecord> {
        self.lifecycle
            .stop(name)
            .await
            .map_err(|e| PluginOperationError::new("stop", name, absent_as_not_found(name, e)))
    }

    async fn unload_plugin(&self, name: &str) -> ServiceResult<()> {
        self.lifecycle
            .unload(name)
            .await
            .map_err(|e| PluginOperationError::new("unload", name, e))
    }

    async fn get_plugin_config(&self, name: &str) -> ServiceResult<PluginConfig> {
        self.lifecycle
            .config(name)
            .map_err(|e| PluginOperationError::new("read configuration of", name, e))
    }

    async fn update_plugin_config(
        &self,
        name: &str,
        config: PluginConfig,
    ) -> ServiceResult<PluginConfig> {
        self.lifecycle
            .update_config(name, config)
            .await
            .map(|record| record.config)
            .map_err(|e| PluginOperationError::new("configure", name, e))
    }

    fn record_api_request(&self, endpoint: &str) {
        self.metrics.record_request(endpoint);
    }

    fn record_api_error(&self, endpoint: &str) {
        self.metrics.record_error(endpoint);
    }

    fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics
            .snapshot(self.lifecycle.registry().count_by_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{CatalogLoader, EchoPlugin, PluginRegistry};
    use tempfile::TempDir;

    fn service(dir: &std::path::Path) -> DefaultPluginService {
        let catalog = CatalogLoader::with_builtins();
        catalog.register("/plugins/echo.jar", "com.example.Echo", || {
            Box::new(EchoPlugin::new())
        });
        let lifecycle = Arc::new(LifecycleManager::new(
            Arc::new(PluginRegistry::new()),
            Arc::new(catalog),
        ));
        let discovery = DiscoveryScanner::new(dir, &["*.jar".to_string()]).unwrap();
        DefaultPluginService::new(lifecycle, discovery)
    }

    #[tokio::test]
    async fn test_echo_end_to_end() {
        let temp = TempDir::new().unwrap();
        let service = service(temp.path());

        let info = service
            .install_plugin("echo", "/plugins/echo.jar", "com.example.Echo")
            .await
            .unwrap();
        assert_eq!(info.state, PluginState::Installed);

        let info = service.start_plugin("echo").await.unwrap();
        assert_eq!(info.state, PluginState::Running);

        assert!(service.get_plugin_config("echo").await.unwrap().is_empty());
        let mut changes = PluginConfig::new();
        changes.insert("mode".into(), "verbose".into());
        service.update_plugin_config("echo", changes).await.unwrap();
        let config = service.get_plugin_config("echo").await.unwrap();
        assert_eq!(config.get("mode").map(String::as_str), Some("verbose"));

        let info = service.stop_plugin("echo").await.unwrap();
        assert_eq!(info.state, PluginState::Stopped);

        service.unload_plugin("echo").await.unwrap();
        let err = service.get_plugin_info("echo").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_missing_plugin_is_not_found() {
        let temp = TempDir::new().unwrap();
        let service = service(temp.path());

        for err in [
            service.start_plugin("ghost").await.unwrap_err(),
            service.stop_plugin("ghost").await.unwrap_err(),
            service.unload_plugin("ghost").await.unwrap_err(),
        ] {
            assert!(err.is_not_found());
            assert!(!err.is_internal());
        }
        assert!(service
            .update_plugin_config("ghost", PluginConfig::new())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_absent_record_maps_to_not_found() {
        let err = absent_as_not_found(
            "echo",
            Error::invalid_state("echo", "start", PluginState::Uninstalled),
        );
        assert!(matches!(err, Error::NotFound(name) if name == "echo"));

        let err = absent_as_not_found(
            "echo",
            Error::invalid_state("echo", "stop", PluginState::Installed),
        );
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unload_racing_start_reports_not_found() {
        let temp = TempDir::new().unwrap();
        let service = Arc::new(service(temp.path()));

        for _ in 0..20 {
            service
                .install_plugin("echo", "/plugins/echo.jar", "com.example.Echo")
                .await
                .unwrap();

            let unloader = Arc::clone(&service);
            let unload = tokio::spawn(async move { unloader.unload_plugin("echo").await });
            let started = service.start_plugin("echo").await;
            let unloaded = unload.await.unwrap();

            match (started, unloaded) {
                // start가 먼저: unload는 RUNNING에서 거부
                (Ok(_), Err(err)) => {
                    assert!(!err.is_not_found());
                    service.stop_plugin("echo").await.unwrap();
                    service.unload_plugin("echo").await.unwrap();
                }
                // unload가 먼저: start는 400이 아니라 NotFound
                (Err(err), Ok(())) => assert!(err.is_not_found(), "{}", err),
                (started, unloaded) => panic!(
                    "unexpected outcome: start ok={}, unload ok={}",
                    started.is_ok(),
                    unloaded.is_ok()
                ),
            }
        }
    }

    #[tokio::test]
    async fn test_error_preserves_cause() {
        let temp = TempDir::new().unwrap();
        let service = service(temp.path());
        service
            .install_plugin("echo", "/plugins/echo.jar", "com.example.Echo")
            .await
            .unwrap();

        let err = service.stop_plugin("echo").await.unwrap_err();
        assert!(matches!(err.cause(), Error::InvalidState { .. }));
        assert_eq!(err.root_message(), "Cannot stop plugin echo in state INSTALLED");
        assert!(err.to_string().starts_with("Failed to stop plugin echo"));
    }

    #[tokio::test]
    async fn test_discover_and_metrics() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("echo.jar"), b"artifact").unwrap();
        let service = service(temp.path());

        let descriptors = service.discover_plugins().await.unwrap();
        assert_eq!(descriptors.len(), 1);
        // 디스커버리는 등록하지 않음
        assert!(service.list_plugins().await.unwrap().is_empty());

        service
            .install_plugin("echo", "/plugins/echo.jar", "com.example.Echo")
            .await
            .unwrap();
        service.record_api_request("POST /api/plugins/install");
        service.record_api_request("GET /api/plugins");
        service.record_api_error("GET /api/plugins");

        let metrics = service.get_metrics();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.total_errors, 1);
        assert_eq!(metrics.plugins.total, 1);
        assert_eq!(metrics.plugins.by_state["INSTALLED"], 1);
    }
}
