//! HTTP 라우트

mod health;
mod metrics;
mod plugins;

pub use health::health_routes;
pub use metrics::metrics_routes;
pub use plugins::{not_found, plugin_routes};
