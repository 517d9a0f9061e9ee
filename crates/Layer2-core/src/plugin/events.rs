//! Lifecycle Events - 라이프사이클 이벤트 버스

use chrono::{DateTime, Utc};
use pdbp_foundation::PluginState;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

// ============================================================================
// LifecycleEvent
// ============================================================================

/// 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Installed,
    Started,
    Stopped,
    Failed,
    Unloaded,
    ConfigChanged,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
            Self::Unloaded => write!(f, "unloaded"),
            Self::ConfigChanged => write!(f, "config_changed"),
        }
    }
}

/// 라이프사이클 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub kind: EventKind,

    /// 플러그인 이름
    pub plugin: String,

    /// 이벤트 이후 상태 (unload 이후는 UNINSTALLED)
    pub state: PluginState,

    pub timestamp: DateTime<Utc>,

    /// 실패 원인 등 부가 메시지
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LifecycleEvent {
    pub fn new(kind: EventKind, plugin: impl Into<String>, state: PluginState) -> Self {
        Self {
            kind,
            plugin: plugin.into(),
            state,
            timestamp: Utc::now(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ============================================================================
// EventBus - 이벤트 버스 (발행/구독)
// ============================================================================

/// 이벤트 버스 - 브로드캐스트 + 최근 이벤트 히스토리
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
    history: RwLock<VecDeque<LifecycleEvent>>,
    history_size: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(256, 100)
    }

    /// 용량 지정하여 생성
    pub fn with_capacity(channel_capacity: usize, history_size: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            sender,
            history: RwLock::new(VecDeque::with_capacity(history_size)),
            history_size,
        }
    }

    /// 이벤트 발행
    pub async fn publish(&self, event: LifecycleEvent) {
        debug!("Publishing event: {} {}", event.kind, event.plugin);

        {
            let mut history = self.history.write().await;
            if self.history_size > 0 {
                if history.len() >= self.history_size {
                    history.pop_front();
                }
                history.push_back(event.clone());
            }
        }

        // 구독자가 없어도 OK
        let _ = self.sender.send(event);
    }

    /// 이벤트 구독
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// 이벤트 히스토리 조회
    pub async fn history(&self) -> Vec<LifecycleEvent> {
        self.history.read().await.iter().cloned().collect()
    }

    /// 특정 플러그인의 이벤트 히스토리
    pub async fn history_for(&self, plugin: &str) -> Vec<LifecycleEvent> {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.plugin == plugin)
            .cloned()
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
