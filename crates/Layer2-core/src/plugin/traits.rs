//! Plugin traits - 핵심 플러그인 인터페이스

use async_trait::async_trait;
use pdbp_foundation::Result;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// 플러그인 설정 (문자열 키/값)
pub type PluginConfig = BTreeMap<String, String>;

// ============================================================================
// PluginContext - 플러그인에 제공되는 컨텍스트
// ============================================================================

/// 플러그인 컨텍스트 - 시작 훅에 전달
///
/// 설정은 시작 시점의 스냅샷입니다. 이후 변경은 `on_configure`로 전달됩니다.
#[derive(Debug, Clone)]
pub struct PluginContext {
    name: String,
    config: PluginConfig,
    cancel: CancellationToken,
}

impl PluginContext {
    pub fn new(name: impl Into<String>, config: PluginConfig, cancel: CancellationToken) -> Self {
        Self {
            name: name.into(),
            config,
            cancel,
        }
    }

    /// 플러그인 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 설정 값 가져오기
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// 전체 설정
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// 시작 취소가 요청되었는지 확인
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 취소 토큰 (오래 걸리는 초기화에서 select 용)
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

// ============================================================================
// Plugin Trait - 모든 플러그인이 구현해야 하는 인터페이스
// ============================================================================

/// 플러그인 트레이트
///
/// 로더가 만든 인스턴스는 라이프사이클 매니저가 단독으로 소유하며,
/// 훅은 항상 한 번에 하나씩 호출됩니다.
#[async_trait]
pub trait Plugin: Send {
    /// 플러그인이 보고하는 버전 (아티팩트 메타데이터보다 우선)
    fn version(&self) -> Option<String> {
        None
    }

    /// 시작 시 호출
    async fn on_start(&mut self, ctx: &PluginContext) -> Result<()>;

    /// 정지 시 호출
    async fn on_stop(&mut self) -> Result<()>;

    /// 실행 중 설정 변경 시 호출 (실패하면 변경이 적용되지 않음)
    async fn on_configure(&mut self, config: &PluginConfig) -> Result<()>;
}
