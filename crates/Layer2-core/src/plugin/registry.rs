//! Plugin Registry - 플러그인 레코드 저장소
//!
//! 이름 → `PluginRecord` 맵. 이름 단위로만 원자적이며 여러 이름에 걸친 트랜잭션은 없습니다.

use super::record::PluginRecord;
use parking_lot::RwLock;
use pdbp_foundation::{Error, PluginState, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// 플러그인 레지스트리
///
/// 명시적으로 생성해서 전달합니다 (전역 인스턴스 없음).
#[derive(Default)]
pub struct PluginRegistry {
    records: RwLock<HashMap<String, PluginRecord>>,
}

impl PluginRegistry {
    /// 새 레지스트리 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드 등록 (이미 있으면 `DuplicateName`)
    pub fn insert(&self, record: PluginRecord) -> Result<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.name) {
            return Err(Error::DuplicateName(record.name));
        }
        debug!("Registered plugin record: {}", record.name);
        records.insert(record.name.clone(), record);
        Ok(())
    }

    /// 레코드 등록 또는 교체, 이전 레코드 반환
    pub fn put(&self, record: PluginRecord) -> Option<PluginRecord> {
        let mut records = self.records.write();
        debug!("Put plugin record: {} ({})", record.name, record.state);
        records.insert(record.name.clone(), record)
    }

    /// 레코드 조회 (복사본)
    pub fn get(&self, name: &str) -> Result<PluginRecord> {
        self.records
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// 레코드 제거
    pub fn remove(&self, name: &str) -> Result<PluginRecord> {
        let removed = self.records.write().remove(name);
        match removed {
            Some(record) => {
                debug!("Removed plugin record: {}", name);
                Ok(record)
            }
            None => Err(Error::NotFound(name.to_string())),
        }
    }

    /// 레코드 수정 후 수정된 복사본 반환
    pub fn update<F>(&self, name: &str, f: F) -> Result<PluginRecord>
    where
        F: FnOnce(&mut PluginRecord),
    {
        let mut records = self.records.write();
        let record = records
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        f(record);
        Ok(record.clone())
    }

    /// 현재 상태 조회 (없으면 None)
    pub fn state_of(&self, name: &str) -> Option<PluginState> {
        self.records.read().get(name).map(|r| r.state)
    }

    /// 이름 목록 (호출 시점의 스냅샷, 순서 없음)
    pub fn list(&self) -> impl Iterator<Item = String> {
        let names: Vec<String> = self.records.read().keys().cloned().collect();
        names.into_iter()
    }

    /// 전체 레코드 스냅샷 (이름순)
    pub fn snapshot(&self) -> Vec<PluginRecord> {
        let mut records: Vec<PluginRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// 상태별 플러그인 수
    pub fn count_by_state(&self) -> BTreeMap<PluginState, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.read().values() {
            *counts.entry(record.state).or_insert(0) += 1;
        }
        counts
    }

    /// 플러그인 존재 여부 확인
    pub fn contains(&self, name: &str) -> bool {
        self.records.read().contains_key(name)
    }

    /// 플러그인 수
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
