use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use senselearn_core::AppError;
use serde::Serialize;
use tracing::error;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
}

/// Payload for requests a middleware guard turns away before any handler
/// runs (`403` CSRF failures and `429` rate limits).
#[derive(Debug, Serialize)]
pub struct GuardRejection {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<i64>,
}

impl GuardRejection {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, seconds: i64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Builds the JSON response with the given status.
    #[must_use]
    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    /// Returns the HTTP status for the wrapped error category.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self.0 {
            AppError::Internal(detail) => {
                error!(error = %detail, "request failed");
                "An unexpected error occurred. Please try again later.".to_owned()
            }
            other => other.message().to_owned(),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_http_statuses() {
        assert_eq!(
            ApiError(AppError::Validation("bad".to_owned())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(AppError::Conflict("taken".to_owned())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError(AppError::Forbidden("nope".to_owned())).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn guard_rejection_omits_retry_after_unless_set() {
        let plain = serde_json::to_value(GuardRejection::new("denied")).unwrap_or_default();
        assert_eq!(plain, serde_json::json!({ "success": false, "error": "denied" }));

        let timed = serde_json::to_value(GuardRejection::new("slow").with_retry_after(7))
            .unwrap_or_default();
        assert_eq!(timed["retry_after"], 7);
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError(AppError::Internal("db exploded".to_owned())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
