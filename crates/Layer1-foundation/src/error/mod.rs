//! Error types for PDBP
//!
//! 플러그인 플랫폼 전체의 에러를 중앙에서 관리

use crate::core::PluginState;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// PDBP 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 레지스트리 관련
    // ========================================================================
    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Plugin name already registered: {0}")]
    DuplicateName(String),

    // ========================================================================
    // 라이프사이클 관련
    // ========================================================================
    #[error("Plugin already installed: {0}")]
    AlreadyInstalled(String),

    #[error("Cannot {operation} plugin {name} in state {state}")]
    InvalidState {
        name: String,
        operation: String,
        state: PluginState,
    },

    #[error("Plugin {plugin} {hook} hook failed: {message}")]
    Hook {
        plugin: String,
        hook: String,
        message: String,
    },

    // ========================================================================
    // 로더 관련
    // ========================================================================
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Entry point {entry_point} not found in {artifact}")]
    EntryPointNotFound {
        artifact: String,
        entry_point: String,
    },

    #[error("Incompatible plugin interface: {0}")]
    IncompatibleInterface(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 이름이 존재하지 않는 경우
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// 예상하지 못한 내부 장애인지 확인 (HTTP 경계에서 500으로 축약)
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Json(_) | Error::Internal(_))
    }

    /// 재시도 가능한 에러인지 확인
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// 잘못된 상태 전이 에러 생성 헬퍼
    pub fn invalid_state(
        name: impl Into<String>,
        operation: impl Into<String>,
        state: PluginState,
    ) -> Self {
        Error::InvalidState {
            name: name.into(),
            operation: operation.into(),
            state,
        }
    }

    /// 훅 실패 에러 생성 헬퍼
    pub fn hook(
        plugin: impl Into<String>,
        hook: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Hook {
            plugin: plugin.into(),
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// 엔트리 포인트 누락 에러 생성 헬퍼
    pub fn entry_point_not_found(
        artifact: impl Into<String>,
        entry_point: impl Into<String>,
    ) -> Self {
        Error::EntryPointNotFound {
            artifact: artifact.into(),
            entry_point: entry_point.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
