//! pdbp-core: Core Runtime for PDBP
//!
//! Layer2 - 플러그인 라이프사이클 엔진 + 서비스 파사드
//!
//! # 주요 모듈
//!
//! - `plugin`: 레지스트리, 로더, 라이프사이클 매니저, 디스커버리, 영속화, 이벤트
//! - `service`: HTTP 레이어가 의존하는 `PluginService` 트레이트와 기본 구현, 메트릭
//!
//! # 사용 예시
//!
//! ```ignore
//! use pdbp_core::{DefaultPluginService, DiscoveryScanner, LifecycleManager, PluginService};
//!
//! let lifecycle = Arc::new(LifecycleManager::new(registry, loader));
//! let service = DefaultPluginService::new(lifecycle, DiscoveryScanner::new("plugins", &patterns)?);
//!
//! service.install_plugin("echo", "builtin/echo", "pdbp.builtin.Echo").await?;
//! service.start_plugin("echo").await?;
//! ```

pub mod plugin;
pub mod service;

// Re-exports: Plugin
pub use plugin::{
    CatalogLoader, DiscoveryReport, DiscoveryScanner, EventBus, LifecycleManager, LoaderChain,
    NativeLoader, Plugin, PluginConfig, PluginContext, PluginDescriptor, PluginLoader,
    PluginRecord, PluginRegistry, PluginStore,
};

// Re-exports: Service
pub use service::{DefaultPluginService, MetricsSnapshot, PluginOperationError, PluginService};
