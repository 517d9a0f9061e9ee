//! API Metrics - 엔드포인트별 요청/에러 카운터

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pdbp_foundation::PluginState;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// 엔드포인트별 단조 증가 카운터
pub struct ApiMetrics {
    started_at: DateTime<Utc>,
    started: Instant,
    counters: Mutex<Counters>,
}

#[derive(Default)]
struct Counters {
    requests: BTreeMap<String, u64>,
    errors: BTreeMap<String, u64>,
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn record_request(&self, endpoint: &str) {
        *self
            .counters
            .lock()
            .requests
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_error(&self, endpoint: &str) {
        *self
            .counters
            .lock()
            .errors
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
    }

    /// 카운터 스냅샷 + 플러그인 상태별 수
    pub fn snapshot(&self, plugins_by_state: BTreeMap<PluginState, usize>) -> MetricsSnapshot {
        let counters = self.counters.lock();

        MetricsSnapshot {
            started_at: self.started_at,
            uptime_seconds: self.started.elapsed().as_secs(),
            total_requests: counters.requests.values().sum(),
            total_errors: counters.errors.values().sum(),
            requests_by_endpoint: counters.requests.clone(),
            errors_by_endpoint: counters.errors.clone(),
            plugins: PluginMetrics {
                total: plugins_by_state.values().sum(),
                by_state: plugins_by_state
                    .into_iter()
                    .map(|(state, count)| (state.to_string(), count))
                    .collect(),
            },
        }
    }
}

/// 메트릭 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub requests_by_endpoint: BTreeMap<String, u64>,
    pub errors_by_endpoint: BTreeMap<String, u64>,
    pub plugins: PluginMetrics,
}

/// 레지스트리 크기
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetrics {
    pub total: usize,
    pub by_state: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_per_endpoint() {
        let metrics = ApiMetrics::new();
        metrics.record_request("GET /api/plugins");
        metrics.record_request("GET /api/plugins");
        metrics.record_request("POST /api/plugins/install");
        metrics.record_error("POST /api/plugins/install");

        let mut states = BTreeMap::new();
        states.insert(PluginState::Running, 2);
        states.insert(PluginState::Installed, 1);
        let snapshot = metrics.snapshot(states);

        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.total_errors, 1);
        assert_eq!(snapshot.requests_by_endpoint["GET /api/plugins"], 2);
        assert_eq!(snapshot.errors_by_endpoint["POST /api/plugins/install"], 1);
        assert_eq!(snapshot.plugins.total, 3);
        assert_eq!(snapshot.plugins.by_state["RUNNING"], 2);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = ApiMetrics::new().snapshot(BTreeMap::new());
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["totalRequests"], 0);
        assert_eq!(json["plugins"]["total"], 0);
        assert!(json["requestsByEndpoint"].as_object().unwrap().is_empty());
    }
}
