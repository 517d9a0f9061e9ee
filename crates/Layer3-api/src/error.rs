//! HTTP 에러 매핑
//!
//! - NotFound → 404
//! - 내부 장애 (IO / JSON / Internal) → 500, 메시지는 `Internal server error` (원인은 로그)
//! - 그 외 → 400, 가장 안쪽 원인 메시지

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pdbp_core::PluginOperationError;
use serde_json::json;
use tracing::error;

/// 500 응답 메시지
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// HTTP 에러
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// 무조건 500으로 축약 (list / discover 실패)
    pub fn internal(err: impl std::fmt::Display) -> Self {
        error!("Unexpected error: {}", err);
        ApiError::Internal(INTERNAL_ERROR_MESSAGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PluginOperationError> for ApiError {
    fn from(err: PluginOperationError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.root_message())
        } else if err.is_internal() {
            ApiError::internal(&err)
        } else {
            error!("{}", err);
            ApiError::BadRequest(err.root_message())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
