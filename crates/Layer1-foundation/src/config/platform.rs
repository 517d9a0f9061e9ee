//! Platform Config - 통합 설정
//!
//! 레이어 순서 (뒤가 우선):
//! 1. 기본값
//! 2. 글로벌 설정 (`~/.config/pdbp/config.json`)
//! 3. 프로젝트 설정 (`./.pdbp/config.json`)
//! 4. 명시적 설정 파일 (`--config`)
//! 5. 환경 변수 (`PDBP_*`)
//!
//! JSON 객체는 필드 단위로 deep merge 한 뒤 역직렬화합니다.

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// 설정 파일명
pub const PDBP_CONFIG_FILE: &str = "config.json";

// ============================================================================
// Platform Config (통합)
// ============================================================================

/// PDBP 통합 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    /// HTTP 서버 설정
    #[serde(default)]
    pub server: ServerConfig,

    /// 플러그인 관리 설정
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PlatformConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 + 명시적 파일 + 환경 변수 병합 로드
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut layers = Vec::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(value) = global.load_optional::<Value>(PDBP_CONFIG_FILE)? {
                debug!("Loaded global config from {}", global.base_dir().display());
                layers.push(value);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(value) = project.load_optional::<Value>(PDBP_CONFIG_FILE)? {
                debug!("Loaded project config from {}", project.base_dir().display());
                layers.push(value);
            }
        }

        // 3. 명시적 설정 파일 (반드시 존재해야 함)
        if let Some(path) = explicit {
            let (store, file_name) = JsonStore::for_file(path)?;
            layers.push(store.load::<Value>(&file_name)?);
        }

        let mut config = Self::from_layers(layers)?;

        // 4. 환경 변수
        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// JSON 레이어들을 순서대로 병합
    pub fn from_layers(layers: impl IntoIterator<Item = Value>) -> Result<Self> {
        let mut merged = Value::Object(Default::default());
        for layer in layers {
            merge_json(&mut merged, layer);
        }
        serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))
    }

    /// 환경 변수 오버라이드 적용
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PDBP_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PDBP_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("PDBP_PORT is not a valid port: {}", port)))?;
        }
        if let Some(dir) = lookup("PDBP_PLUGIN_DIR") {
            self.plugins.directory = PathBuf::from(dir);
        }
        if let Some(file) = lookup("PDBP_STATE_FILE") {
            self.plugins.state_file = Some(PathBuf::from(file));
        }
        if let Some(timeout) = lookup("PDBP_TIMEOUT_MS") {
            self.plugins.operation_timeout_ms = timeout.parse().map_err(|_| {
                Error::Config(format!("PDBP_TIMEOUT_MS is not a number: {}", timeout))
            })?;
        }
        Ok(())
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must not be 0".into()));
        }
        if self.plugins.directory.as_os_str().is_empty() {
            return Err(Error::Config("plugins.directory must not be empty".into()));
        }
        if self.plugins.artifact_patterns.is_empty() {
            return Err(Error::Config(
                "plugins.artifactPatterns must list at least one pattern".into(),
            ));
        }
        if self.plugins.operation_timeout_ms == 0 {
            return Err(Error::Config(
                "plugins.operationTimeoutMs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// 설정 저장
    pub fn save(&self, path: &Path) -> Result<()> {
        let (store, file_name) = JsonStore::for_file(path)?;
        store.save(&file_name, self)
    }
}

/// `overlay`의 값으로 `base`를 덮어씀 (객체는 재귀 병합)
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP 서버 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// `host:port` 형태의 바인드 주소 (IPv6 호스트는 `[::1]:port`)
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

// ============================================================================
// Plugins Config
// ============================================================================

/// 플러그인 관리 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginsConfig {
    /// 플러그인 아티팩트 검색 디렉토리
    #[serde(default = "default_plugin_dir")]
    pub directory: PathBuf,

    /// 아티팩트로 인식할 파일 패턴 (glob)
    #[serde(default = "default_artifact_patterns")]
    pub artifact_patterns: Vec<String>,

    /// 로더/훅 호출 제한 시간
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// 설치 정보 저장 파일
    #[serde(default = "default_state_file")]
    pub state_file: Option<PathBuf>,

    /// 설치 정보 영속화 여부
    #[serde(default = "default_true")]
    pub persist_state: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_dir(),
            artifact_patterns: default_artifact_patterns(),
            operation_timeout_ms: default_operation_timeout_ms(),
            state_file: default_state_file(),
            persist_state: true,
        }
    }
}

impl PluginsConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// 영속화가 켜져 있을 때만 상태 파일 경로 반환
    pub fn effective_state_file(&self) -> Option<&Path> {
        if self.persist_state {
            self.state_file.as_deref()
        } else {
            None
        }
    }
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_artifact_patterns() -> Vec<String> {
    ["*.so", "*.dylib", "*.dll", "*.jar"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_operation_timeout_ms() -> u64 {
    30_000
}

fn default_state_file() -> Option<PathBuf> {
    Some(PathBuf::from("state/plugins.json"))
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Logging Config
// ============================================================================

/// 로깅 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// 기본 로그 레벨 (RUST_LOG가 우선)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
