//! Plugin lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// 플러그인 라이프사이클 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginState {
    /// 레지스트리에 없음
    Uninstalled,
    /// 설치됨 (인스턴스 없음)
    Installed,
    /// 시작 중
    Starting,
    /// 실행 중
    Running,
    /// 정지 중
    Stopping,
    /// 정지됨
    Stopped,
    /// 실패
    Failed,
}

impl PluginState {
    pub const ALL: [PluginState; 7] = [
        PluginState::Uninstalled,
        PluginState::Installed,
        PluginState::Starting,
        PluginState::Running,
        PluginState::Stopping,
        PluginState::Stopped,
        PluginState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninstalled => "UNINSTALLED",
            Self::Installed => "INSTALLED",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Failed => "FAILED",
        }
    }

    /// 이 상태에서 인스턴스가 존재해야 하는지
    pub fn has_instance(&self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Stopping)
    }

    pub fn can_start(&self) -> bool {
        matches!(self, Self::Installed | Self::Stopped)
    }

    pub fn can_stop(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn can_unload(&self) -> bool {
        matches!(self, Self::Installed | Self::Stopped | Self::Failed)
    }

    /// 같은 이름으로 재설치가 허용되는 상태
    pub fn can_reinstall(&self) -> bool {
        matches!(self, Self::Uninstalled | Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
