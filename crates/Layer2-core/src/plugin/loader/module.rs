//! Loaded Module - 로드된 플러그인 코드와 격리 스코프
//!
//! 획득/해제가 대칭인 스코프 자원입니다. 해제 시 인스턴스를 먼저 버리고
//! 그 다음 스코프(라이브러리 등)를 닫습니다.

use super::super::traits::Plugin;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// ModuleHandle - 모듈 식별 정보
// ============================================================================

/// 로드 한 번마다 새로 발급되는 모듈 핸들
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    pub id: Uuid,
    pub artifact: PathBuf,
    pub entry_point: String,
    pub loaded_at: DateTime<Utc>,
}

impl ModuleHandle {
    pub fn new(artifact: &Path, entry_point: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            artifact: artifact.to_path_buf(),
            entry_point: entry_point.to_string(),
            loaded_at: Utc::now(),
        }
    }
}

// ============================================================================
// ModuleScope - 격리 스코프
// ============================================================================

/// 인스턴스가 의존하는 격리 스코프
pub enum ModuleScope {
    /// 동적 라이브러리 (인스턴스 코드가 여기 있음)
    Library(libloading::Library),

    /// 프로세스 내 스코프 (살아있는 스코프 수 추적)
    Tracked(LiveScope),
}

impl fmt::Debug for ModuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library(_) => write!(f, "ModuleScope::Library"),
            Self::Tracked(_) => write!(f, "ModuleScope::Tracked"),
        }
    }
}

/// 살아있는 동안 공유 카운터를 1 증가시키는 가드
#[derive(Debug)]
pub struct LiveScope {
    live: Arc<AtomicUsize>,
}

impl LiveScope {
    pub fn enter(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            live: Arc::clone(live),
        }
    }
}

impl Drop for LiveScope {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// LoadedModule
// ============================================================================

/// 로드된 플러그인 (핸들 + 인스턴스 + 스코프)
pub struct LoadedModule {
    handle: ModuleHandle,
    instance: Option<Box<dyn Plugin>>,
    scope: Option<ModuleScope>,
}

impl LoadedModule {
    pub fn new(handle: ModuleHandle, instance: Box<dyn Plugin>, scope: ModuleScope) -> Self {
        Self {
            handle,
            instance: Some(instance),
            scope: Some(scope),
        }
    }

    pub fn handle(&self) -> &ModuleHandle {
        &self.handle
    }

    /// 인스턴스 접근 (해제 후에는 None)
    pub fn instance_mut(&mut self) -> Option<&mut (dyn Plugin + 'static)> {
        self.instance.as_deref_mut()
    }

    /// 플러그인이 보고한 버전
    pub fn reported_version(&self) -> Option<String> {
        self.instance.as_ref().and_then(|p| p.version())
    }

    pub fn is_released(&self) -> bool {
        self.instance.is_none() && self.scope.is_none()
    }

    /// 인스턴스 → 스코프 순으로 해제 (여러 번 호출해도 안전)
    pub fn release(&mut self) {
        if self.is_released() {
            return;
        }
        drop(self.instance.take());
        drop(self.scope.take());
        debug!(
            "Released module {} ({})",
            self.handle.id, self.handle.entry_point
        );
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("handle", &self.handle)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for LoadedModule {
    fn drop(&mut self) {
        self.release();
    }
}
