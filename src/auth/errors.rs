use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Every failure the auth flow can produce.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("email already registered")]
    DuplicateEmail,

    // Unknown email and wrong password both map here.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing session token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("user not found")]
    UserNotFound,

    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "ValidationError",
            AuthError::DuplicateEmail => "DuplicateEmail",
            AuthError::InvalidCredentials => "InvalidCredentials",
            AuthError::MissingToken => "MissingToken",
            AuthError::InvalidToken => "InvalidToken",
            AuthError::ExpiredToken => "ExpiredToken",
            AuthError::UserNotFound => "UserNotFound",
            AuthError::StoreUnavailable(_) => "StoreUnavailable",
            AuthError::Internal(_) => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return AuthError::DuplicateEmail;
            }
        }
        AuthError::StoreUnavailable(e.to_string())
    }
}

/// Uniform error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(code = self.code(), "request rejected");
        }

        let message = self.code();
        let detail = match self {
            AuthError::Validation(detail) => Some(detail),
            _ => None,
        };
        let body = ErrorBody { message, detail };
        (status, Json(body)).into_response()
    }
}
