//! pdbp-api: REST layer for PDBP
//!
//! Layer3 - `PluginService` 위의 얇은 HTTP 레이어
//!
//! | Method | Path                        | 성공                  |
//! |--------|-----------------------------|-----------------------|
//! | GET    | /health                     | 200 `{"status":"UP"}` |
//! | GET    | /api/plugins                | 200 플러그인 정보 배열  |
//! | GET    | /api/plugins/discover       | 200 디스크립터 배열     |
//! | GET    | /api/plugins/{name}         | 200 플러그인 정보       |
//! | POST   | /api/plugins/install        | 201 플러그인 정보       |
//! | POST   | /api/plugins/{name}/start   | 200 플러그인 정보       |
//! | POST   | /api/plugins/{name}/stop    | 200 플러그인 정보       |
//! | DELETE | /api/plugins/{name}         | 200 메시지             |
//! | GET    | /api/plugins/{name}/config  | 200 설정 맵            |
//! | PUT    | /api/plugins/{name}/config  | 200 설정 맵            |
//! | GET    | /api/metrics                | 200 메트릭 스냅샷       |
//!
//! 에러 응답은 항상 `{"error": "<message>"}` 형태입니다.

pub mod dto;
pub mod routes;
pub mod server;

mod error;
mod middleware;

pub use error::{ApiError, ApiResult};
pub use server::{router, serve, AppState};
