//! Plugin Loader - 아티팩트에서 플러그인 인스턴스 생성
//!
//! ## 로더 종류
//!
//! 1. **NativeLoader**: 동적 라이브러리 (`.so` / `.dylib` / `.dll`)
//! 2. **CatalogLoader**: 프로세스 내 팩토리 카탈로그 (빌트인 / 테스트)
//! 3. **LoaderChain**: 아티팩트를 받아주는 첫 번째 로더로 위임
//!
//! 로더 호출은 블로킹일 수 있으므로 라이프사이클 매니저가 blocking 스레드에서 실행합니다.

mod catalog;
mod module;
mod native;

pub use catalog::{CatalogArtifact, CatalogLoader, PluginFactory};
pub use module::{LiveScope, LoadedModule, ModuleHandle, ModuleScope};
pub use native::{entry_symbol, NativeLoader, PluginCreate, ABI_VERSION_SYMBOL, VERSION_SYMBOL};

use pdbp_foundation::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// 호스트가 기대하는 플러그인 인터페이스 버전
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// 설치 시 검증 결과 (인스턴스 생성 없음)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactInfo {
    /// 아티팩트가 선언한 버전
    pub version: Option<String>,
}

// ============================================================================
// PluginLoader Trait
// ============================================================================

/// 플러그인 로더 트레이트
pub trait PluginLoader: Send + Sync {
    /// 로더 이름 (로그용)
    fn name(&self) -> &str;

    /// 이 로더가 처리할 수 있는 아티팩트인지
    fn accepts(&self, artifact: &Path) -> bool;

    /// 아티팩트와 엔트리 포인트가 해석 가능한지 확인
    fn validate(&self, artifact: &Path, entry_point: &str) -> Result<ArtifactInfo>;

    /// 새 격리 스코프에서 인스턴스 생성
    fn load(&self, artifact: &Path, entry_point: &str) -> Result<LoadedModule>;

    /// 스코프 해제 (멱등)
    fn unload(&self, module: &mut LoadedModule) {
        module.release();
    }
}

// ============================================================================
// LoaderChain
// ============================================================================

/// 여러 로더를 순서대로 시도하는 로더
#[derive(Default)]
pub struct LoaderChain {
    loaders: Vec<Arc<dyn PluginLoader>>,
}

impl LoaderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 로더 추가 (먼저 추가한 로더가 우선)
    pub fn with(mut self, loader: Arc<dyn PluginLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    fn route(&self, artifact: &Path) -> Result<&Arc<dyn PluginLoader>> {
        if let Some(loader) = self.loaders.iter().find(|l| l.accepts(artifact)) {
            debug!("Routing {} to {} loader", artifact.display(), loader.name());
            return Ok(loader);
        }

        if artifact.exists() {
            Err(Error::IncompatibleInterface(format!(
                "No loader supports artifact {}",
                artifact.display()
            )))
        } else {
            Err(Error::ArtifactNotFound(artifact.display().to_string()))
        }
    }
}

impl PluginLoader for LoaderChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn accepts(&self, artifact: &Path) -> bool {
        self.loaders.iter().any(|l| l.accepts(artifact))
    }

    fn validate(&self, artifact: &Path, entry_point: &str) -> Result<ArtifactInfo> {
        self.route(artifact)?.validate(artifact, entry_point)
    }

    fn load(&self, artifact: &Path, entry_point: &str) -> Result<LoadedModule> {
        self.route(artifact)?.load(artifact, entry_point)
    }
}
