//! 요청 메트릭 미들웨어

use crate::server::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

/// 라우트에 매칭되지 않은 요청의 엔드포인트 키
const UNMATCHED: &str = "(unmatched)";

/// `METHOD matched-path` 단위로 요청 수와 에러 수(status >= 400)를 기록
pub async fn track_metrics(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED.to_string());
    let endpoint = format!("{} {}", req.method(), path);

    state.service.record_api_request(&endpoint);
    let response = next.run(req).await;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        state.service.record_api_error(&endpoint);
    }
    response
}
