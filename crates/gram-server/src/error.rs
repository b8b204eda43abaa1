//! JSON error responses: `{message, code}` with the status the code maps to.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gram_core::ErrorCode;
use gram_core::api::ErrorBody;
use gram_core::error::EngagementError;
use tracing::{error, warn};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: status_for(code),
            body: ErrorBody::new(message, code),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

#[must_use]
pub fn status_for(code: ErrorCode) -> StatusCode {
    StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<EngagementError> for ApiError {
    fn from(err: EngagementError) -> Self {
        match &err {
            EngagementError::Storage(source) => {
                error!(error = %source, "storage failure");
            }
            EngagementError::NotFound { .. }
            | EngagementError::Validation { .. }
            | EngagementError::Unauthenticated(_) => {}
        }
        Self {
            status: status_for(err.code()),
            body: ErrorBody::from(&err),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        warn!(error = %err, "request task did not complete");
        Self::new(
            ErrorCode::InternalUnexpected,
            ErrorCode::InternalUnexpected.message(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
