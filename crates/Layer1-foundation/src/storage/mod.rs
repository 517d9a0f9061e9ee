//! Storage module for PDBP
//!
//! - `json`: JSON - 설정 파일 및 플러그인 상태 파일 저장/로드

mod json;

// JSON Storage (범용)
pub use json::JsonStore;
