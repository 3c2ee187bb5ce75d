//! Application error types.

use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use ums_core::auth::AuthError;
use ums_core::auth::access::AccessDenied;
use ums_core::images::ImageError;
use ums_core::store::StoreError;
use ums_core::validation::ValidationError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate email or mobile. Reported as 400.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A correctly signed access token that has run out. Still a 401, but
    /// tagged so clients can tell it apart from a forged token.
    #[error("Token expired: {0}")]
    TokenExpired(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) | AppError::TokenExpired(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message) = match &self {
            AppError::Validation(m) => ("validation_error", m.as_str()),
            AppError::Conflict(m) => ("conflict", m.as_str()),
            AppError::BadRequest(m) => ("bad_request", m.as_str()),
            AppError::Unauthorized(m) => ("unauthorized", m.as_str()),
            AppError::TokenExpired(m) => ("token_expired", m.as_str()),
            AppError::Forbidden(m) => ("forbidden", m.as_str()),
            AppError::NotFound(m) => ("not_found", m.as_str()),
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                ("internal_error", "Internal server error")
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::NotFound => AppError::NotFound("User not found".into()),
            StoreError::DbError(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AccessDenied> for AppError {
    fn from(e: AccessDenied) -> Self {
        if e.is_bad_request() {
            AppError::BadRequest(e.to_string())
        } else {
            AppError::Forbidden(e.to_string())
        }
    }
}

impl From<ImageError> for AppError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::UnsupportedType(_) | ImageError::TooLarge(_) => {
                AppError::Validation(e.to_string())
            }
            ImageError::Io(e) => AppError::Internal(format!("image storage: {e}")),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.0)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(e: MultipartRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Validation(e.body_text())
    }
}
