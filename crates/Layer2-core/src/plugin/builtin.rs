//! Builtin plugins
//!
//! `CatalogLoader::with_builtins()`로 등록되는 플러그인들.

use super::traits::{Plugin, PluginConfig, PluginContext};
use async_trait::async_trait;
use pdbp_foundation::Result;
use tracing::info;

/// echo 플러그인의 가상 아티팩트 경로
pub const ECHO_ARTIFACT: &str = "builtin/echo";

/// echo 플러그인 엔트리 포인트
pub const ECHO_ENTRY_POINT: &str = "pdbp.builtin.Echo";

/// 받은 설정과 라이프사이클 이벤트를 로그로 되돌려주는 플러그인
#[derive(Debug, Default)]
pub struct EchoPlugin {
    name: String,
    config: PluginConfig,
    running: bool,
}

impl EchoPlugin {
    pub const VERSION: &'static str = "1.0.0";

    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 `mode` 설정 (기본: normal)
    pub fn mode(&self) -> &str {
        self.config.get("mode").map(String::as_str).unwrap_or("normal")
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 입력을 모드에 맞춰 되돌려줌
    pub fn echo(&self, input: &str) -> String {
        match self.mode() {
            "verbose" => format!("[{}] {}", self.name, input),
            _ => input.to_string(),
        }
    }
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn version(&self) -> Option<String> {
        Some(Self::VERSION.to_string())
    }

    async fn on_start(&mut self, ctx: &PluginContext) -> Result<()> {
        self.name = ctx.name().to_string();
        self.config = ctx.config().clone();
        self.running = true;
        info!("{}", self.echo(&format!("echo plugin started (mode: {})", self.mode())));
        Ok(())
    }

    async fn on_stop(&mut self) -> Result<()> {
        self.running = false;
        info!("{}", self.echo("echo plugin stopped"));
        Ok(())
    }

    async fn on_configure(&mut self, config: &PluginConfig) -> Result<()> {
        self.config = config.clone();
        info!("{}", self.echo(&format!("echo plugin reconfigured (mode: {})", self.mode())));
        Ok(())
    }
}
