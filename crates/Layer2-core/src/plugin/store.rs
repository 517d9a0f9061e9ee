//! Plugin Store - 플러그인 설치 정보 영속화
//!
//! 설치된 플러그인 목록을 상태 파일(JSON)에 저장하고 부팅 시 복원합니다.
//! 실행 상태는 저장하지 않습니다. 복원된 플러그인은 항상 INSTALLED에서 시작합니다.

use super::record::PluginRecord;
use super::registry::PluginRegistry;
use super::traits::PluginConfig;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pdbp_foundation::{JsonStore, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// StoredPlugin - 저장된 플러그인 정보
// ============================================================================

/// 상태 파일에 저장되는 플러그인 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPlugin {
    pub name: String,
    pub version: String,
    pub artifact_path: PathBuf,
    pub entry_point: String,
    #[serde(default)]
    pub config: PluginConfig,
    pub installed_at: DateTime<Utc>,
}

impl From<&PluginRecord> for StoredPlugin {
    fn from(record: &PluginRecord) -> Self {
        Self {
            name: record.name.clone(),
            version: record.version.clone(),
            artifact_path: record.artifact_path.clone(),
            entry_point: record.entry_point.clone(),
            config: record.config.clone(),
            installed_at: record.installed_at,
        }
    }
}

/// 상태 파일 구조
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPluginsFile {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub plugins: Vec<StoredPlugin>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for StoredPluginsFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            plugins: Vec::new(),
        }
    }
}

// ============================================================================
// PluginStore
// ============================================================================

/// 플러그인 상태 파일 저장소
pub struct PluginStore {
    store: JsonStore,
    file_name: String,
    /// 스냅샷 + 쓰기를 직렬화
    write_lock: Mutex<()>,
}

impl PluginStore {
    /// 상태 파일 경로로 생성
    pub fn new(path: &Path) -> Result<Self> {
        let (store, file_name) = JsonStore::for_file(path)?;
        Ok(Self {
            store,
            file_name,
            write_lock: Mutex::new(()),
        })
    }

    /// 상태 파일 경로
    pub fn path(&self) -> PathBuf {
        self.store.file_path(&self.file_name)
    }

    /// 저장된 플러그인 목록 (파일이 없으면 빈 목록)
    pub fn load(&self) -> Result<Vec<StoredPlugin>> {
        let file: Option<StoredPluginsFile> = self.store.load_optional(&self.file_name)?;
        let plugins = file.map(|f| f.plugins).unwrap_or_default();
        info!("Loaded {} stored plugins from {}", plugins.len(), self.path().display());
        Ok(plugins)
    }

    /// 레지스트리의 현재 내용을 저장
    pub fn persist(&self, registry: &PluginRegistry) -> Result<()> {
        let _guard = self.write_lock.lock();

        let file = StoredPluginsFile {
            plugins: registry.snapshot().iter().map(StoredPlugin::from).collect(),
            ..Default::default()
        };

        self.store.save(&self.file_name, &file)?;
        debug!("Saved {} plugins to {}", file.plugins.len(), self.path().display());
        Ok(())
    }
}
