//! Wire DTOs
//!
//! 내부 타입 (`PluginRecord`, `PluginDescriptor`) 을 HTTP 계약 필드명으로 변환합니다.

use pdbp_core::{PluginDescriptor, PluginRecord};
use serde::{Deserialize, Serialize};

/// 플러그인 정보 `{name, version, state, jarPath}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfoDto {
    pub name: String,
    pub version: String,
    pub state: String,
    pub jar_path: Option<String>,
}

impl PluginInfoDto {
    /// 목록 조회 중 사라진 플러그인 자리표시
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "unknown".to_string(),
            state: "UNKNOWN".to_string(),
            jar_path: None,
        }
    }
}

impl From<PluginRecord> for PluginInfoDto {
    fn from(record: PluginRecord) -> Self {
        Self {
            name: record.name,
            version: record.version,
            state: record.state.to_string(),
            jar_path: Some(record.artifact_path.display().to_string()),
        }
    }
}

/// 디스커버리 결과 `{name, jarPath, className, size}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDescriptorDto {
    pub name: String,
    pub jar_path: String,
    pub class_name: Option<String>,
    pub size: u64,
}

impl From<PluginDescriptor> for PluginDescriptorDto {
    fn from(descriptor: PluginDescriptor) -> Self {
        Self {
            name: descriptor.name,
            jar_path: descriptor.artifact_path.display().to_string(),
            class_name: descriptor.entry_point,
            size: descriptor.size_bytes,
        }
    }
}

/// 설치 요청 본문
///
/// 필드 누락은 역직렬화 단계가 아니라 핸들러에서 400으로 보고합니다.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRequest {
    #[serde(default)]
    pub plugin_name: Option<String>,
    #[serde(default)]
    pub jar_path: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
}

impl InstallRequest {
    /// 세 필드 모두 비어 있지 않을 때만 반환
    pub fn required_fields(&self) -> Option<(&str, &str, &str)> {
        fn field(value: &Option<String>) -> Option<&str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
        }
        Some((
            field(&self.plugin_name)?,
            field(&self.jar_path)?,
            field(&self.class_name)?,
        ))
    }
}

/// 단순 메시지 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub message: String,
}

/// 헬스 체크 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

impl HealthDto {
    pub fn up() -> Self {
        Self {
            status: "UP".to_string(),
        }
    }
}
