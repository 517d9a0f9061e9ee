//! Service - HTTP 레이어용 작업 단위 파사드
//!
//! - `facade.rs` - PluginService 트레이트 + DefaultPluginService
//! - `metrics.rs` - 엔드포인트별 요청/에러 카운터

mod facade;
mod metrics;

pub use facade::{DefaultPluginService, PluginOperationError, PluginService, ServiceResult};
pub use metrics::{ApiMetrics, MetricsSnapshot, PluginMetrics};
