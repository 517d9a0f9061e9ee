//! Core Module - 핵심 타입
//!
//! 모든 레이어가 공유하는 플러그인 라이프사이클 상태를 정의합니다.
//!
//! ```text
//!  (absent) ──install──▶ INSTALLED ──start──▶ STARTING ──▶ RUNNING
//!                                               │            │ stop
//!                                               ▼            ▼
//!                                            FAILED ◀──── STOPPING ──▶ STOPPED
//! ```
//!
//! INSTALLED, STOPPED, FAILED 상태에서만 unload 가능합니다.

pub mod state;

pub use state::PluginState;
