//! Platform wiring - 설정으로부터 로더 체인, 라이프사이클, 서비스 조립

use pdbp_core::{
    CatalogLoader, DefaultPluginService, DiscoveryScanner, LifecycleManager, LoaderChain,
    NativeLoader, PluginRegistry, PluginStore,
};
use pdbp_foundation::{PlatformConfig, Result};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 실행 중인 플랫폼 구성 요소
pub struct Platform {
    pub lifecycle: Arc<LifecycleManager>,
    pub service: Arc<DefaultPluginService>,
}

impl Platform {
    pub fn build(config: &PlatformConfig) -> Result<Self> {
        let loader = LoaderChain::new()
            .with(Arc::new(CatalogLoader::with_builtins()))
            .with(Arc::new(NativeLoader::new()));

        let mut lifecycle = LifecycleManager::new(Arc::new(PluginRegistry::new()), Arc::new(loader))
            .with_timeout(config.plugins.operation_timeout());

        if let Some(path) = config.plugins.effective_state_file() {
            let store = PluginStore::new(path)?;
            info!("Persisting installed plugins to {}", store.path().display());
            lifecycle = lifecycle.with_store(Arc::new(store));
        }

        let lifecycle = Arc::new(lifecycle);
        let discovery =
            DiscoveryScanner::new(&config.plugins.directory, &config.plugins.artifact_patterns)?;
        let service = Arc::new(DefaultPluginService::new(Arc::clone(&lifecycle), discovery));

        Ok(Self { lifecycle, service })
    }

    /// 저장된 설치 정보 복원 (실패해도 서버는 계속 기동)
    pub async fn restore(&self) {
        if let Err(e) = self.lifecycle.restore().await {
            warn!("Could not restore installed plugins: {}", e);
        }
    }

    /// 라이프사이클 이벤트를 로그로 흘려보냄
    ///
    /// 이벤트 버스가 닫히면 끝나며 기록한 이벤트 수를 돌려줍니다.
    pub fn watch_events(&self) -> JoinHandle<usize> {
        let mut receiver = self.lifecycle.events().subscribe();
        tokio::spawn(async move {
            let mut seen = 0;
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        seen += 1;
                        match &event.message {
                            Some(message) => info!(
                                "Plugin {} {} ({}): {}",
                                event.plugin, event.kind, event.state, message
                            ),
                            None => info!("Plugin {} {} ({})", event.plugin, event.kind, event.state),
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event log lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Event log closed after {} events", seen);
            seen
        })
    }
}
