//! Plugin Record - 레지스트리에 저장되는 플러그인 정보

use super::traits::PluginConfig;
use chrono::{DateTime, Utc};
use pdbp_foundation::PluginState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 버전 정보가 없을 때 표시되는 값
pub const UNKNOWN_VERSION: &str = "unknown";

// ============================================================================
// PluginRecord - 설치된 플러그인 정보
// ============================================================================

/// 설치된 플러그인 한 개의 레코드
///
/// 레지스트리 밖으로는 항상 복사본으로만 전달됩니다.
/// 인스턴스는 라이프사이클 매니저가 별도로 보관합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRecord {
    /// 플러그인 이름 (고유, 변경 불가)
    pub name: String,

    /// 버전 (정보용)
    pub version: String,

    /// 현재 라이프사이클 상태
    pub state: PluginState,

    /// 아티팩트 경로
    pub artifact_path: PathBuf,

    /// 엔트리 포인트 (구현 타입 식별자)
    pub entry_point: String,

    /// 플러그인 설정
    #[serde(default)]
    pub config: PluginConfig,

    /// 설치 시간
    pub installed_at: DateTime<Utc>,

    /// 마지막 변경 시간
    pub updated_at: DateTime<Utc>,

    /// 마지막 실패 원인
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PluginRecord {
    /// INSTALLED 상태의 새 레코드 생성
    pub fn installed(
        name: impl Into<String>,
        version: Option<String>,
        artifact_path: impl Into<PathBuf>,
        entry_point: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            version: version.unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            state: PluginState::Installed,
            artifact_path: artifact_path.into(),
            entry_point: entry_point.into(),
            config: PluginConfig::new(),
            installed_at: now,
            updated_at: now,
            last_error: None,
        }
    }

    /// 설정 지정
    pub fn with_config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }

    /// 상태 전이 (성공 상태로 가면 실패 원인 초기화)
    pub fn transition(&mut self, state: PluginState) {
        self.state = state;
        if state != PluginState::Failed {
            self.last_error = None;
        }
        self.touch();
    }

    /// FAILED 상태로 전이하며 원인 기록
    pub fn fail(&mut self, cause: impl Into<String>) {
        self.state = PluginState::Failed;
        self.last_error = Some(cause.into());
        self.touch();
    }

    /// 변경 시간 갱신
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// PluginDescriptor - 발견된 플러그인 후보
// ============================================================================

/// 디렉토리 스캔으로 발견된 (아직 설치되지 않은) 플러그인 후보
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptor {
    /// 이름 (사이드카 매니페스트 또는 파일명에서 유도)
    pub name: String,

    /// 아티팩트 경로
    pub artifact_path: PathBuf,

    /// 엔트리 포인트 (알 수 없으면 None)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,

    /// 파일 크기 (bytes)
    pub size_bytes: u64,

    /// 매니페스트에 기록된 버전
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
