//! Config - 플랫폼 설정 관리
//!
//! - `platform.rs` - PlatformConfig 통합 설정 (server / plugins / logging)

mod platform;

pub use platform::{
    LoggingConfig, PlatformConfig, PluginsConfig, ServerConfig, PDBP_CONFIG_FILE,
};
