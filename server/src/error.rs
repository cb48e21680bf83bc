use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use rummage_common::listing::ValidationError;
use rummage_common::message::MessageShapeError;
use rummage_common::order::OrderError;
use rummage_common::review::{DuplicateReview, RatingError};

/// Uniform error body for every failed request.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Everything a handler can fail with, mapped onto one status scheme.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("not permitted")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%self, "request failed");
            // Generic retryable message; details stay in the log.
            return (
                status,
                Json(ErrorResponse {
                    error: "temporary upstream failure, please retry".to_string(),
                }),
            )
                .into_response();
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Unauthorized => ApiError::Forbidden,
            other => ApiError::Conflict(other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<MessageShapeError> for ApiError {
    fn from(err: MessageShapeError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<RatingError> for ApiError {
    fn from(err: RatingError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<DuplicateReview> for ApiError {
    fn from(err: DuplicateReview) -> Self {
        ApiError::Conflict(err.to_string())
    }
}
