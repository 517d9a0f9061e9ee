//! Catalog Loader - 프로세스 내 플러그인 팩토리 카탈로그
//!
//! 가상 아티팩트 경로 → (버전, ABI, 엔트리 포인트별 팩토리).
//! 빌트인 플러그인과 테스트 플러그인을 동적 라이브러리 없이 제공합니다.

use super::module::{LiveScope, LoadedModule, ModuleHandle, ModuleScope};
use super::{ArtifactInfo, PluginLoader, PLUGIN_ABI_VERSION};
use crate::plugin::builtin::{EchoPlugin, ECHO_ARTIFACT, ECHO_ENTRY_POINT};
use crate::plugin::traits::Plugin;
use parking_lot::RwLock;
use pdbp_foundation::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 플러그인 인스턴스 팩토리
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

// ============================================================================
// CatalogArtifact - 카탈로그 항목
// ============================================================================

/// 카탈로그에 등록되는 가상 아티팩트
#[derive(Clone)]
pub struct CatalogArtifact {
    version: Option<String>,
    abi_version: u32,
    entries: HashMap<String, PluginFactory>,
}

impl Default for CatalogArtifact {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogArtifact {
    pub fn new() -> Self {
        Self {
            version: None,
            abi_version: PLUGIN_ABI_VERSION,
            entries: HashMap::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// 아티팩트가 선언하는 ABI 버전 (기본: 호스트와 동일)
    pub fn abi_version(mut self, abi_version: u32) -> Self {
        self.abi_version = abi_version;
        self
    }

    /// 엔트리 포인트 추가
    pub fn entry<F>(mut self, entry_point: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.entries.insert(entry_point.into(), Arc::new(factory));
        self
    }
}

// ============================================================================
// CatalogLoader
// ============================================================================

/// 프로세스 내 카탈로그 로더
#[derive(Default)]
pub struct CatalogLoader {
    artifacts: RwLock<HashMap<PathBuf, CatalogArtifact>>,
    live: Arc<AtomicUsize>,
}

impl CatalogLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 빌트인 플러그인이 등록된 카탈로그
    pub fn with_builtins() -> Self {
        let loader = Self::new();
        loader.add(
            ECHO_ARTIFACT,
            CatalogArtifact::new()
                .version(EchoPlugin::VERSION)
                .entry(ECHO_ENTRY_POINT, || Box::new(EchoPlugin::new())),
        );
        loader
    }

    /// 아티팩트 등록 (같은 경로면 교체)
    pub fn add(&self, artifact: impl Into<PathBuf>, entry: CatalogArtifact) {
        let artifact = artifact.into();
        debug!("Catalog artifact registered: {}", artifact.display());
        self.artifacts.write().insert(artifact, entry);
    }

    /// 엔트리 포인트 하나만 가진 아티팩트 등록
    pub fn register<F>(&self, artifact: impl Into<PathBuf>, entry_point: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.add(artifact, CatalogArtifact::new().entry(entry_point, factory));
    }

    /// 아티팩트 제거 (디스크에서 삭제된 것과 같은 효과)
    pub fn remove(&self, artifact: &Path) -> bool {
        self.artifacts.write().remove(artifact).is_some()
    }

    /// 아직 해제되지 않은 스코프 수
    pub fn live_scopes(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn resolve(&self, artifact: &Path, entry_point: &str) -> Result<(PluginFactory, Option<String>)> {
        let artifacts = self.artifacts.read();
        let entry = artifacts
            .get(artifact)
            .ok_or_else(|| Error::ArtifactNotFound(artifact.display().to_string()))?;

        if entry.abi_version != PLUGIN_ABI_VERSION {
            return Err(Error::IncompatibleInterface(format!(
                "{} targets plugin ABI {} (host expects {})",
                artifact.display(),
                entry.abi_version,
                PLUGIN_ABI_VERSION
            )));
        }

        let factory = entry
            .entries
            .get(entry_point)
            .cloned()
            .ok_or_else(|| Error::entry_point_not_found(artifact.display().to_string(), entry_point))?;

        Ok((factory, entry.version.clone()))
    }
}

impl PluginLoader for CatalogLoader {
    fn name(&self) -> &str {
        "catalog"
    }

    fn accepts(&self, artifact: &Path) -> bool {
        self.artifacts.read().contains_key(artifact)
    }

    fn validate(&self, artifact: &Path, entry_point: &str) -> Result<ArtifactInfo> {
        let (_, version) = self.resolve(artifact, entry_point)?;
        Ok(ArtifactInfo { version })
    }

    fn load(&self, artifact: &Path, entry_point: &str) -> Result<LoadedModule> {
        let (factory, _) = self.resolve(artifact, entry_point)?;
        let scope = LiveScope::enter(&self.live);
        let instance = factory();
        Ok(LoadedModule::new(
            ModuleHandle::new(artifact, entry_point),
            instance,
            ModuleScope::Tracked(scope),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_echo_resolves() {
        let loader = CatalogLoader::with_builtins();
        let info = loader
            .validate(Path::new(ECHO_ARTIFACT), ECHO_ENTRY_POINT)
            .unwrap();
        assert_eq!(info.version.as_deref(), Some(EchoPlugin::VERSION));
        // validate는 인스턴스를 만들지 않음
        assert_eq!(loader.live_scopes(), 0);
    }

    #[test]
    fn test_missing_entry_point() {
        let loader = CatalogLoader::with_builtins();
        let err = loader
            .validate(Path::new(ECHO_ARTIFACT), "pdbp.builtin.Missing")
            .unwrap_err();
        assert!(matches!(err, Error::EntryPointNotFound { .. }));
    }

    #[test]
    fn test_incompatible_abi() {
        let loader = CatalogLoader::new();
        loader.add(
            "/plugins/legacy.jar",
            CatalogArtifact::new()
                .abi_version(PLUGIN_ABI_VERSION + 1)
                .entry("legacy.Main", || Box::new(EchoPlugin::new())),
        );

        let err = loader
            .load(Path::new("/plugins/legacy.jar"), "legacy.Main")
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleInterface(_)));
        assert_eq!(loader.live_scopes(), 0);
    }

    #[test]
    fn test_scopes_are_independent_and_released() {
        let loader = CatalogLoader::with_builtins();
        let artifact = Path::new(ECHO_ARTIFACT);

        let mut first = loader.load(artifact, ECHO_ENTRY_POINT).unwrap();
        let second = loader.load(artifact, ECHO_ENTRY_POINT).unwrap();
        assert_ne!(first.handle().id, second.handle().id);
        assert_eq!(loader.live_scopes(), 2);

        loader.unload(&mut first);
        loader.unload(&mut first);
        assert!(first.is_released());
        assert_eq!(loader.live_scopes(), 1);

        drop(second);
        assert_eq!(loader.live_scopes(), 0);
    }

    #[test]
    fn test_remove_artifact() {
        let loader = CatalogLoader::with_builtins();
        assert!(loader.remove(Path::new(ECHO_ARTIFACT)));
        assert!(!loader.accepts(Path::new(ECHO_ARTIFACT)));
    }
}
