//! # pdbp-foundation
//!
//! Foundation layer for PDBP:
//! - Core: 플러그인 상태 머신 (`PluginState`)
//! - Error: 플랫폼 공통 에러 타입
//! - Config: 통합 설정 (PlatformConfig)
//! - Storage: JsonStore (설정 / 설치 상태 저장)

pub mod config;
pub mod core;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core
// ============================================================================
pub use core::PluginState;

// ============================================================================
// Config
// ============================================================================
pub use config::{LoggingConfig, PlatformConfig, PluginsConfig, ServerConfig, PDBP_CONFIG_FILE};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;
