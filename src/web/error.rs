use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::logging;

/// API 錯誤，輸出為 `{"error": message}`
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 記錄原因後回傳 500，回應中只有 `message`
    pub fn internal(message: impl Into<String>, cause: anyhow::Error) -> Self {
        let message = message.into();
        logging::error_file_async(format!("{} because {:?}", message, cause));
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// 六位數字的股票代號，否則回傳 400
pub fn validate_code(code: &str) -> Result<(), ApiError> {
    if crate::crawler::naver::industry::is_stock_code(code) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Invalid stock code '{}', expected 6 digits",
            code
        )))
    }
}
