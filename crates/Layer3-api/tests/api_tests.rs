//! HTTP integration tests

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use pdbp_api::{router, AppState};
use pdbp_core::plugin::EchoPlugin;
use pdbp_core::service::{ApiMetrics, ServiceResult};
use pdbp_core::{
    CatalogLoader, DefaultPluginService, DiscoveryScanner, LifecycleManager, MetricsSnapshot,
    PluginConfig, PluginDescriptor, PluginOperationError, PluginRecord, PluginRegistry,
    PluginService,
};
use pdbp_foundation::Error;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn echo_app(plugin_dir: &Path) -> Router {
    let catalog = CatalogLoader::with_builtins();
    catalog.register("/plugins/echo.jar", "com.example.Echo", || {
        Box::new(EchoPlugin::new())
    });
    let lifecycle = Arc::new(LifecycleManager::new(
        Arc::new(PluginRegistry::new()),
        Arc::new(catalog),
    ));
    let discovery = DiscoveryScanner::new(plugin_dir, &["*.jar".to_string()]).unwrap();
    let service = DefaultPluginService::new(lifecycle, discovery);
    router(AppState::new(Arc::new(service)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn install_body() -> Value {
    json!({
        "pluginName": "echo",
        "jarPath": "/plugins/echo.jar",
        "className": "com.example.Echo"
    })
}

#[tokio::test]
async fn test_health() {
    let temp = TempDir::new().unwrap();
    let app = echo_app(temp.path());

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "UP" }));
}

#[tokio::test]
async fn test_echo_lifecycle_over_http() {
    let temp = TempDir::new().unwrap();
    let app = echo_app(temp.path());

    let (status, body) = send(&app, Method::POST, "/api/plugins/install", Some(install_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "echo");
    assert_eq!(body["state"], "INSTALLED");
    assert_eq!(body["jarPath"], "/plugins/echo.jar");

    let (status, body) = send(&app, Method::POST, "/api/plugins/echo/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "RUNNING");
    assert_eq!(body["version"], "1.0.0");

    let (status, body) = send(&app, Method::GET, "/api/plugins/echo/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/plugins/echo/config",
        Some(json!({ "mode": "verbose" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "mode": "verbose" }));

    let (_, body) = send(&app, Method::GET, "/api/plugins/echo/config", None).await;
    assert_eq!(body["mode"], "verbose");

    let (status, body) = send(&app, Method::GET, "/api/plugins", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["state"], "RUNNING");

    let (status, body) = send(&app, Method::POST, "/api/plugins/echo/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "STOPPED");

    let (status, body) = send(&app, Method::DELETE, "/api/plugins/echo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Plugin unloaded: echo");

    let (status, body) = send(&app, Method::GET, "/api/plugins/echo", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Plugin not found: echo");
}

#[tokio::test]
async fn test_not_found_lists_available_plugins() {
    let temp = TempDir::new().unwrap();
    let app = echo_app(temp.path());

    let (status, body) = send(&app, Method::POST, "/api/plugins/ghost/start", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"],
        "Plugin not found: ghost. No plugins installed. Install a plugin first: POST /api/plugins/install"
    );

    send(&app, Method::POST, "/api/plugins/install", Some(install_body())).await;

    let (status, body) = send(&app, Method::POST, "/api/plugins/ghost/stop", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Plugin not found: ghost. Available plugins: [echo]");

    let (status, body) = send(&app, Method::DELETE, "/api/plugins/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Plugin not found: ghost. Available plugins: [echo]");
}

#[tokio::test]
async fn test_invalid_transitions_are_bad_requests() {
    let temp = TempDir::new().unwrap();
    let app = echo_app(temp.path());
    send(&app, Method::POST, "/api/plugins/install", Some(install_body())).await;

    let (status, body) = send(&app, Method::POST, "/api/plugins/echo/stop", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot stop plugin echo in state INSTALLED");

    send(&app, Method::POST, "/api/plugins/echo/start", None).await;
    let (status, body) = send(&app, Method::DELETE, "/api/plugins/echo", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot unload plugin echo in state RUNNING");

    let (status, body) = send(&app, Method::POST, "/api/plugins/install", Some(install_body())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Plugin already installed: echo");
}

#[tokio::test]
async fn test_install_validation() {
    let temp = TempDir::new().unwrap();
    let app = echo_app(temp.path());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/plugins/install",
        Some(json!({ "pluginName": "echo", "jarPath": "/plugins/echo.jar" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: pluginName, jarPath, className");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/plugins/install",
        Some(json!({
            "pluginName": "missing",
            "jarPath": "/plugins/missing.jar",
            "className": "com.example.Missing"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Artifact not found: /plugins/missing.jar");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/plugins/install")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_discover_does_not_register() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("echo.jar"), b"artifact").unwrap();
    let app = echo_app(temp.path());

    let (status, body) = send(&app, Method::GET, "/api/plugins/discover", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "echo");
    assert_eq!(body[0]["size"], 8);

    let (_, body) = send(&app, Method::GET, "/api/plugins", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_unknown_route() {
    let temp = TempDir::new().unwrap();
    let app = echo_app(temp.path());

    let (status, body) = send(&app, Method::GET, "/api/nothing/here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Resource not found: /api/nothing/here");
}

#[tokio::test]
async fn test_metrics_count_requests_and_errors() {
    let temp = TempDir::new().unwrap();
    let app = echo_app(temp.path());

    send(&app, Method::GET, "/api/plugins", None).await;
    send(&app, Method::GET, "/api/plugins/ghost", None).await;
    send(&app, Method::GET, "/api/plugins/other", None).await;

    let (status, body) = send(&app, Method::GET, "/api/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requestsByEndpoint"]["GET /api/plugins"], 1);
    assert_eq!(body["requestsByEndpoint"]["GET /api/plugins/{name}"], 2);
    assert_eq!(body["errorsByEndpoint"]["GET /api/plugins/{name}"], 2);
    assert_eq!(body["plugins"]["total"], 0);
}

// ============================================================================
// Failing service
// ============================================================================

/// 모든 작업이 내부 장애로 실패하는 서비스
struct BrokenService;

fn broken(operation: &str) -> PluginOperationError {
    PluginOperationError::for_all(operation, Error::Internal("storage offline".into()))
}

#[async_trait]
impl PluginService for BrokenService {
    async fn list_plugins(&self) -> ServiceResult<Vec<String>> {
        Err(broken("list"))
    }

    async fn get_plugin_info(&self, _name: &str) -> ServiceResult<PluginRecord> {
        Err(broken("get"))
    }

    async fn discover_plugins(&self) -> ServiceResult<Vec<PluginDescriptor>> {
        Err(broken("discover"))
    }

    async fn install_plugin(&self, _: &str, _: &str, _: &str) -> ServiceResult<PluginRecord> {
        Err(broken("install"))
    }

    async fn start_plugin(&self, _name: &str) -> ServiceResult<PluginRecord> {
        Err(broken("start"))
    }

    async fn stop_plugin(&self, _name: &str) -> ServiceResult<PluginRecord> {
        Err(broken("stop"))
    }

    async fn unload_plugin(&self, _name: &str) -> ServiceResult<()> {
        Err(broken("unload"))
    }

    async fn get_plugin_config(&self, _name: &str) -> ServiceResult<PluginConfig> {
        Err(broken("read configuration of"))
    }

    async fn update_plugin_config(
        &self,
        _name: &str,
        _config: PluginConfig,
    ) -> ServiceResult<PluginConfig> {
        Err(broken("configure"))
    }

    fn record_api_request(&self, _endpoint: &str) {}

    fn record_api_error(&self, _endpoint: &str) {}

    fn get_metrics(&self) -> MetricsSnapshot {
        ApiMetrics::new().snapshot(BTreeMap::new())
    }
}

#[tokio::test]
async fn test_internal_errors_are_generic() {
    let app = router(AppState::new(Arc::new(BrokenService)));

    for (method, uri, body) in [
        (Method::GET, "/api/plugins", None),
        (Method::GET, "/api/plugins/discover", None),
        (Method::POST, "/api/plugins/echo/start", None),
        (Method::POST, "/api/plugins/install", Some(install_body())),
    ] {
        let (status, body) = send(&app, method, uri, body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(body["error"], "Internal server error");
    }
}
