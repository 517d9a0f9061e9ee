//! Lifecycle Manager - 플러그인 상태 전이 관리
//!
//! | From                        | Operation | To (성공)              | To (실패)    |
//! |-----------------------------|-----------|------------------------|--------------|
//! | (없음), STOPPED, FAILED     | install   | INSTALLED              | 변경 없음    |
//! | INSTALLED, STOPPED          | start     | RUNNING (STARTING 경유) | FAILED       |
//! | RUNNING                     | stop      | STOPPED (STOPPING 경유) | FAILED       |
//! | INSTALLED, STOPPED, FAILED  | unload    | (없음)                 | -            |
//!
//! ## 동시성
//!
//! - 이름마다 비동기 뮤텍스(슬롯)가 있어 같은 플러그인의 전이는 한 번에 하나만 실행
//! - 서로 다른 이름은 동시에 진행 (전역 락 없음)
//! - 인스턴스는 슬롯 안에만 존재하며 밖으로는 `PluginRecord` 복사본만 나감
//! - 로더/훅 호출은 타임아웃으로 제한. 초과하면 FAILED (원인: Timeout)
//! - 시작 취소는 협조적: 로드 직후 체크포인트에서 확인, 커밋된 전이는 되돌리지 않음
//! - 호출자가 전이 도중 future를 버리면 `Transition` 가드가 모듈을 해제하고 FAILED로 마무리

use super::events::{EventBus, EventKind, LifecycleEvent};
use super::loader::{LoadedModule, PluginLoader};
use super::record::PluginRecord;
use super::registry::PluginRegistry;
use super::store::PluginStore;
use super::traits::{PluginConfig, PluginContext};
use chrono::Utc;
use pdbp_foundation::{Error, PluginState, Result};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 기본 로더/훅 타임아웃
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// 플러그인별 슬롯 - 인스턴스 보관 + 전이 직렬화
#[derive(Default)]
struct PluginSlot {
    module: Option<LoadedModule>,
}

type SlotRef = Arc<AsyncMutex<PluginSlot>>;

/// 부팅 시 복원 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// INSTALLED로 복원된 수
    pub restored: usize,
    /// 검증 실패로 FAILED가 된 수
    pub failed: usize,
}

// ============================================================================
// LifecycleManager
// ============================================================================

/// 라이프사이클 매니저
pub struct LifecycleManager {
    registry: Arc<PluginRegistry>,
    loader: Arc<dyn PluginLoader>,
    events: Arc<EventBus>,
    store: Option<Arc<PluginStore>>,
    slots: parking_lot::Mutex<HashMap<String, SlotRef>>,
    in_flight: parking_lot::Mutex<HashMap<String, CancellationToken>>,
    timeout: Duration,
}

impl LifecycleManager {
    /// 새 매니저 생성
    pub fn new(registry: Arc<PluginRegistry>, loader: Arc<dyn PluginLoader>) -> Self {
        Self {
            registry,
            loader,
            events: Arc::new(EventBus::new()),
            store: None,
            slots: parking_lot::Mutex::new(HashMap::new()),
            in_flight: parking_lot::Mutex::new(HashMap::new()),
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// 로더/훅 타임아웃 지정
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 설치 정보 영속화
    pub fn with_store(mut self, store: Arc<PluginStore>) -> Self {
        self.store = Some(store);
        self
    }

    // ========================================================================
    // 접근자
    // ========================================================================

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 레코드 조회
    pub fn get(&self, name: &str) -> Result<PluginRecord> {
        self.registry.get(name)
    }

    /// 설정 조회
    pub fn config(&self, name: &str) -> Result<PluginConfig> {
        self.registry.get(name).map(|r| r.config)
    }

    /// 인스턴스 보유 여부 (진행 중인 전이가 끝날 때까지 대기)
    pub async fn has_instance(&self, name: &str) -> bool {
        let slot = self.slots.lock().get(name).cloned();
        match slot {
            Some(slot) => slot.lock().await.module.is_some(),
            None => false,
        }
    }

    // ========================================================================
    // install
    // ========================================================================

    /// 플러그인 설치 (인스턴스 생성 없이 해석 가능 여부만 검증)
    pub async fn install(
        &self,
        name: &str,
        artifact_path: impl Into<PathBuf>,
        entry_point: &str,
    ) -> Result<PluginRecord> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Plugin name must not be empty".into()));
        }
        if entry_point.trim().is_empty() {
            return Err(Error::InvalidInput("Entry point must not be empty".into()));
        }
        let artifact_path = artifact_path.into();

        let (slot, _guard) = self.lock_slot(name).await;

        let previous = self.registry.state_of(name);
        if let Some(state) = previous {
            if !state.can_reinstall() {
                return Err(Error::AlreadyInstalled(name.to_string()));
            }
        }

        info!("Installing plugin {} from {}", name, artifact_path.display());

        let artifact = artifact_path.clone();
        let entry = entry_point.to_string();
        let validated = self
            .call_loader(name, "validate", move |loader| loader.validate(&artifact, &entry))
            .await;

        let info = match validated {
            Ok(info) => info,
            Err(e) => {
                warn!("Plugin {} failed validation: {}", name, e);
                if previous.is_none() {
                    self.forget_slot(name, &slot);
                }
                return Err(e);
            }
        };

        let record = PluginRecord::installed(name, info.version, artifact_path, entry_point);
        if self.registry.put(record.clone()).is_some() {
            info!("Replaced previous installation of plugin {}", name);
        }

        self.publish(EventKind::Installed, name, PluginState::Installed, None)
            .await;
        self.persist();

        info!("Plugin {} installed (v{})", name, record.version);
        Ok(record)
    }

    // ========================================================================
    // start
    // ========================================================================

    /// 플러그인 시작: STARTING → 로드 → 시작 훅 → RUNNING
    pub async fn start(&self, name: &str) -> Result<PluginRecord> {
        let (slot, guard) = self.lock_slot(name).await;

        let record = match self.registry.get(name) {
            Ok(record) => record,
            Err(_) => {
                self.forget_slot(name, &slot);
                return Err(Error::invalid_state(name, "start", PluginState::Uninstalled));
            }
        };
        if !record.state.can_start() {
            return Err(Error::invalid_state(name, "start", record.state));
        }

        self.registry
            .update(name, |r| r.transition(PluginState::Starting))?;
        let token = self.begin_operation(name);
        let mut transition = Transition::new(self, name, "start", guard);
        info!("Starting plugin {}", name);

        let result = self.start_inner(&record, transition.slot(), &token).await;

        match result {
            Ok(reported_version) => {
                let updated = self.registry.update(name, |r| {
                    if let Some(version) = reported_version {
                        r.version = version;
                    }
                    r.transition(PluginState::Running);
                });
                transition.commit();
                let updated = updated?;
                self.publish(EventKind::Started, name, PluginState::Running, None)
                    .await;
                info!("Plugin {} is running", name);
                Ok(updated)
            }
            Err(e) => {
                self.release_module(transition.slot());
                transition.commit();
                self.mark_failed(name, "start", &e).await;
                Err(e)
            }
        }
    }

    async fn start_inner(
        &self,
        record: &PluginRecord,
        slot: &mut PluginSlot,
        token: &CancellationToken,
    ) -> Result<Option<String>> {
        let name = record.name.as_str();
        let artifact = record.artifact_path.clone();
        let entry = record.entry_point.clone();

        let module = self
            .call_loader(name, "load", move |loader| loader.load(&artifact, &entry))
            .await?;
        debug!("Plugin {} loaded as module {}", name, module.handle().id);
        slot.module = Some(module);

        // 체크포인트: 훅 실행 전 취소 확인
        if token.is_cancelled() {
            return Err(Error::Cancelled(format!("Start of plugin {} was cancelled", name)));
        }

        let ctx = PluginContext::new(name, record.config.clone(), token.clone());
        let module = slot
            .module
            .as_mut()
            .ok_or_else(|| Error::Internal(format!("Module of plugin {} vanished", name)))?;
        let reported_version = module.reported_version();
        let instance = module
            .instance_mut()
            .ok_or_else(|| Error::Internal(format!("Plugin {} has no instance", name)))?;

        self.bounded(name, "start hook", async {
            instance
                .on_start(&ctx)
                .await
                .map_err(|e| hook_error(name, "start", e))
        })
        .await?;

        Ok(reported_version)
    }

    // ========================================================================
    // stop
    // ========================================================================

    /// 플러그인 정지: STOPPING → 정지 훅 → 스코프 해제 → STOPPED
    ///
    /// 훅이 실패해도 스코프는 해제되며 FAILED로 끝납니다.
    pub async fn stop(&self, name: &str) -> Result<PluginRecord> {
        let (slot, guard) = self.lock_slot(name).await;

        let state = match self.registry.state_of(name) {
            Some(state) => state,
            None => {
                self.forget_slot(name, &slot);
                return Err(Error::invalid_state(name, "stop", PluginState::Uninstalled));
            }
        };
        if !state.can_stop() {
            return Err(Error::invalid_state(name, "stop", state));
        }

        self.registry
            .update(name, |r| r.transition(PluginState::Stopping))?;
        let mut transition = Transition::new(self, name, "stop", guard);
        info!("Stopping plugin {}", name);

        let hook_result = match transition.slot().module.as_mut().and_then(|m| m.instance_mut()) {
            Some(instance) => {
                self.bounded(name, "stop hook", async {
                    instance
                        .on_stop()
                        .await
                        .map_err(|e| hook_error(name, "stop", e))
                })
                .await
            }
            None => Err(Error::Internal(format!(
                "Plugin {} is running without an instance",
                name
            ))),
        };

        self.release_module(transition.slot());

        match hook_result {
            Ok(()) => {
                let updated = self
                    .registry
                    .update(name, |r| r.transition(PluginState::Stopped));
                transition.commit();
                let updated = updated?;
                self.publish(EventKind::Stopped, name, PluginState::Stopped, None)
                    .await;
                info!("Plugin {} stopped", name);
                Ok(updated)
            }
            Err(e) => {
                transition.commit();
                self.mark_failed(name, "stop", &e).await;
                Err(e)
            }
        }
    }

    // ========================================================================
    // unload
    // ========================================================================

    /// 플러그인 제거 (INSTALLED / STOPPED / FAILED에서만)
    pub async fn unload(&self, name: &str) -> Result<()> {
        let (slot, mut guard) = self.lock_slot(name).await;

        let state = match self.registry.state_of(name) {
            Some(state) => state,
            None => {
                self.forget_slot(name, &slot);
                return Err(Error::NotFound(name.to_string()));
            }
        };
        if !state.can_unload() {
            return Err(Error::invalid_state(name, "unload", state));
        }

        self.release_module(&mut guard);
        self.registry.remove(name)?;
        self.forget_slot(name, &slot);

        self.publish(EventKind::Unloaded, name, PluginState::Uninstalled, None)
            .await;
        self.persist();

        info!("Plugin {} unloaded", name);
        Ok(())
    }

    // ========================================================================
    // 설정
    // ========================================================================

    /// 설정 병합. RUNNING이면 먼저 `on_configure`를 호출하고, 실패하면 변경하지 않음
    pub async fn update_config(&self, name: &str, changes: PluginConfig) -> Result<PluginRecord> {
        let (slot, guard) = self.lock_slot(name).await;

        let record = match self.registry.get(name) {
            Ok(record) => record,
            Err(e) => {
                self.forget_slot(name, &slot);
                return Err(e);
            }
        };

        let mut merged = record.config.clone();
        merged.extend(changes);

        let mut transition = Transition::new(self, name, "configure", guard);
        if record.state == PluginState::Running {
            let configured = match transition.slot().module.as_mut().and_then(|m| m.instance_mut()) {
                Some(instance) => {
                    self.bounded(name, "configure hook", async {
                        instance
                            .on_configure(&merged)
                            .await
                            .map_err(|e| hook_error(name, "configure", e))
                    })
                    .await
                }
                None => Err(Error::Internal(format!(
                    "Plugin {} is running without an instance",
                    name
                ))),
            };

            if let Err(e) = configured {
                if matches!(e, Error::Timeout(_)) {
                    self.release_module(transition.slot());
                    transition.commit();
                    self.mark_failed(name, "configure", &e).await;
                } else {
                    transition.commit();
                    warn!("Plugin {} rejected configuration: {}", name, e);
                }
                return Err(e);
            }
        }

        let updated = self.registry.update(name, |r| {
            r.config = merged;
            r.touch();
        });
        transition.commit();
        let updated = updated?;

        self.publish(EventKind::ConfigChanged, name, updated.state, None)
            .await;
        self.persist();

        debug!("Plugin {} configuration updated", name);
        Ok(updated)
    }

    // ========================================================================
    // 취소 / 복원 / 종료
    // ========================================================================

    /// 진행 중인 시작 작업 취소 요청 (진행 중인 작업이 없으면 false)
    pub fn cancel(&self, name: &str) -> bool {
        match self.in_flight.lock().get(name) {
            Some(token) => {
                info!("Cancellation requested for plugin {}", name);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// 상태 파일에서 설치 정보 복원
    pub async fn restore(&self) -> Result<RestoreSummary> {
        let Some(store) = self.store.as_ref() else {
            return Ok(RestoreSummary::default());
        };

        let mut summary = RestoreSummary::default();

        for stored in store.load()? {
            let name = stored.name.clone();
            let (_slot, _guard) = self.lock_slot(&name).await;

            let artifact = stored.artifact_path.clone();
            let entry = stored.entry_point.clone();
            let validated = self
                .call_loader(&name, "validate", move |loader| {
                    loader.validate(&artifact, &entry)
                })
                .await;

            let mut record = PluginRecord {
                name: stored.name,
                version: stored.version,
                state: PluginState::Installed,
                artifact_path: stored.artifact_path,
                entry_point: stored.entry_point,
                config: stored.config,
                installed_at: stored.installed_at,
                updated_at: Utc::now(),
                last_error: None,
            };

            let (kind, message) = match validated {
                Ok(info) => {
                    if let Some(version) = info.version {
                        record.version = version;
                    }
                    (EventKind::Installed, None)
                }
                Err(e) => {
                    warn!("Restored plugin {} is no longer loadable: {}", name, e);
                    record.fail(e.to_string());
                    (EventKind::Failed, Some(e.to_string()))
                }
            };

            let state = record.state;
            if let Err(e) = self.registry.insert(record) {
                warn!("Skipping restore of plugin {}: {}", name, e);
                continue;
            }
            match kind {
                EventKind::Failed => summary.failed += 1,
                _ => summary.restored += 1,
            }
            self.publish(kind, &name, state, message).await;
        }

        info!(
            "Restored {} plugins ({} failed validation)",
            summary.restored, summary.failed
        );
        Ok(summary)
    }

    /// 진행 중인 시작을 취소하고 실행 중인 모든 플러그인 정지. 정지에 성공한 수 반환
    pub async fn shutdown(&self) -> usize {
        let starting: Vec<String> = self.in_flight.lock().keys().cloned().collect();
        for name in &starting {
            self.cancel(name);
        }

        let running: Vec<String> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|r| r.state == PluginState::Running)
            .map(|r| r.name)
            .collect();

        if running.is_empty() {
            return 0;
        }
        info!("Stopping {} running plugins", running.len());

        let results = futures::future::join_all(running.iter().map(|name| self.stop(name))).await;

        let mut stopped = 0;
        for (name, result) in running.iter().zip(results) {
            match result {
                Ok(_) => stopped += 1,
                Err(e) => warn!("Failed to stop plugin {} during shutdown: {}", name, e),
            }
        }
        stopped
    }

    // ========================================================================
    // 내부 헬퍼
    // ========================================================================

    /// 이름별 슬롯 잠금. 잠금을 얻은 뒤 슬롯이 아직 현재 슬롯인지 확인
    async fn lock_slot(&self, name: &str) -> (SlotRef, OwnedMutexGuard<PluginSlot>) {
        loop {
            let slot = {
                let mut slots = self.slots.lock();
                Arc::clone(slots.entry(name.to_string()).or_default())
            };

            let guard = Arc::clone(&slot).lock_owned().await;

            let current = self
                .slots
                .lock()
                .get(name)
                .map(|s| Arc::ptr_eq(s, &slot))
                .unwrap_or(false);
            if current {
                return (slot, guard);
            }
            // unload가 슬롯을 제거한 경우 새 슬롯으로 재시도
        }
    }

    /// 슬롯 제거 (슬롯 잠금을 가진 상태에서만 호출)
    fn forget_slot(&self, name: &str, slot: &SlotRef) {
        let mut slots = self.slots.lock();
        if slots.get(name).map(|s| Arc::ptr_eq(s, slot)).unwrap_or(false) {
            slots.remove(name);
        }
    }

    fn release_module(&self, slot: &mut PluginSlot) {
        if let Some(mut module) = slot.module.take() {
            self.loader.unload(&mut module);
        }
    }

    fn begin_operation(&self, name: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.in_flight
            .lock()
            .insert(name.to_string(), token.clone());
        token
    }

    fn end_operation(&self, name: &str) {
        self.in_flight.lock().remove(name);
    }

    /// 타임아웃 적용
    async fn bounded<T, F>(&self, name: &str, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "{} of plugin {} exceeded {}ms",
                what,
                name,
                self.timeout.as_millis()
            ))),
        }
    }

    /// 로더 호출 (blocking 스레드 + 타임아웃)
    ///
    /// 타임아웃 후 늦게 끝난 로드 결과는 버려지며 `LoadedModule`의 Drop에서 해제됩니다.
    async fn call_loader<T, F>(&self, name: &str, what: &str, f: F) -> Result<T>
    where
        F: FnOnce(&dyn PluginLoader) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let loader = Arc::clone(&self.loader);
        let task = tokio::task::spawn_blocking(move || f(loader.as_ref()));

        self.bounded(name, what, async move {
            task.await
                .map_err(|e| Error::Internal(format!("Loader task failed: {}", e)))?
        })
        .await
    }

    async fn mark_failed(&self, name: &str, operation: &str, cause: &Error) {
        if self.record_failure(name, operation, cause) {
            self.publish(
                EventKind::Failed,
                name,
                PluginState::Failed,
                Some(cause.to_string()),
            )
            .await;
        }
    }

    /// 레코드를 FAILED로 표시 (동기 부분)
    fn record_failure(&self, name: &str, operation: &str, cause: &Error) -> bool {
        error!("Failed to {} plugin {}: {}", operation, name, cause);
        match self.registry.update(name, |r| r.fail(cause.to_string())) {
            Ok(_) => true,
            Err(e) => {
                warn!("Cannot record failure of plugin {}: {}", name, e);
                false
            }
        }
    }

    async fn publish(&self, kind: EventKind, name: &str, state: PluginState, message: Option<String>) {
        let mut event = LifecycleEvent::new(kind, name, state);
        if let Some(message) = message {
            event = event.with_message(message);
        }
        self.events.publish(event).await;
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.persist(&self.registry) {
                warn!("Failed to persist plugin state: {}", e);
            }
        }
    }
}

// ============================================================================
// Transition - 버려진 전이 정리
// ============================================================================

/// 슬롯 잠금을 쥔 채 진행 중인 전이
///
/// `commit` 전에 drop 되면 (호출자가 future를 버린 경우) 모듈을 해제하고
/// 레코드를 `Cancelled` 원인의 FAILED로 남깁니다. 잠금은 정리 후에 풀립니다.
struct Transition<'a> {
    manager: &'a LifecycleManager,
    name: &'a str,
    operation: &'static str,
    slot: OwnedMutexGuard<PluginSlot>,
    committed: bool,
}

impl<'a> Transition<'a> {
    fn new(
        manager: &'a LifecycleManager,
        name: &'a str,
        operation: &'static str,
        slot: OwnedMutexGuard<PluginSlot>,
    ) -> Self {
        Self {
            manager,
            name,
            operation,
            slot,
            committed: false,
        }
    }

    fn slot(&mut self) -> &mut PluginSlot {
        &mut self.slot
    }

    /// 결과가 레지스트리에 반영됨. 이후 drop은 잠금만 해제
    fn commit(&mut self) {
        if !self.committed {
            self.committed = true;
            self.manager.end_operation(self.name);
        }
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let manager = self.manager;
        let cause = Error::Cancelled(format!(
            "{} of plugin {} was abandoned before completion",
            self.operation, self.name
        ));
        warn!("{}", cause);

        manager.release_module(&mut self.slot);
        manager.end_operation(self.name);
        if !manager.record_failure(self.name, self.operation, &cause) {
            return;
        }

        // Drop에서는 await 불가: 런타임이 있으면 이벤트 발행을 넘김
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let events = Arc::clone(&manager.events);
            let event = LifecycleEvent::new(EventKind::Failed, self.name, PluginState::Failed)
                .with_message(cause.to_string());
            handle.spawn(async move { events.publish(event).await });
        }
    }
}

/// 훅 에러를 `Hook`으로 감쌈 (타임아웃/취소/이미 감싼 에러는 그대로)
fn hook_error(name: &str, hook: &str, err: Error) -> Error {
    match err {
        Error::Hook { .. } | Error::Timeout(_) | Error::Cancelled(_) => err,
        other => Error::hook(name, hook, other.to_string()),
    }
}
