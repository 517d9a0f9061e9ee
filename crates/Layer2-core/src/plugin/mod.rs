//! # Plugin System
//!
//! 플러그인 라이프사이클 엔진
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LifecycleManager                         │
//! │   install / start / stop / unload / update_config           │
//! │   (이름별 슬롯 락, 타임아웃, 협조적 취소)                       │
//! │                          │                                  │
//! │     ┌────────────────────┼────────────────────┐             │
//! │     ▼                    ▼                    ▼             │
//! │ PluginRegistry       PluginLoader          EventBus         │
//! │ (name → Record)   ┌──────┴──────┐        PluginStore       │
//! │                   ▼             ▼                           │
//! │             NativeLoader   CatalogLoader                    │
//! │             (.so/.dll)     (builtin/test)                   │
//! └─────────────────────────────────────────────────────────────┘
//!
//!   DiscoveryScanner ── 디렉토리 스캔 → PluginDescriptor (등록 안 함)
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! let loader = LoaderChain::new()
//!     .with(Arc::new(CatalogLoader::with_builtins()))
//!     .with(Arc::new(NativeLoader::new()));
//! let manager = LifecycleManager::new(Arc::new(PluginRegistry::new()), Arc::new(loader));
//!
//! manager.install("echo", "builtin/echo", "pdbp.builtin.Echo").await?;
//! manager.start("echo").await?;
//! ```

pub mod builtin;
mod discovery;
mod events;
mod lifecycle;
pub mod loader;
mod record;
mod registry;
mod store;
mod traits;

pub use builtin::{EchoPlugin, ECHO_ARTIFACT, ECHO_ENTRY_POINT};
pub use discovery::{DiscoveryReport, DiscoveryScan, DiscoveryScanner, MANIFEST_SUFFIX};
pub use events::{EventBus, EventKind, LifecycleEvent};
pub use lifecycle::{LifecycleManager, RestoreSummary, DEFAULT_OPERATION_TIMEOUT};
pub use loader::{
    ArtifactInfo, CatalogArtifact, CatalogLoader, LoadedModule, LoaderChain, ModuleHandle,
    NativeLoader, PluginLoader, PLUGIN_ABI_VERSION,
};
pub use record::{PluginDescriptor, PluginRecord, UNKNOWN_VERSION};
pub use registry::PluginRegistry;
pub use store::{PluginStore, StoredPlugin};
pub use traits::{Plugin, PluginConfig, PluginContext};
