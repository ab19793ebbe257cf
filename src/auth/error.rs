use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::{jwt::TokenError, repo::DuplicateEmail};

/// Outcome of a failed register/login/profile call.
///
/// Display strings are the only text sent to clients; causes stay in the logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{required} are required")]
    MissingField { required: &'static str },
    #[error("malformed request body")]
    MalformedBody,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("missing or invalid authorization header")]
    MissingOrMalformedHeader,
    #[error("invalid or expired token")]
    Unauthorized(#[source] TokenError),
    #[error("user not found")]
    UserNotFound,
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<DuplicateEmail> for AuthError {
    fn from(_: DuplicateEmail) -> Self {
        AuthError::EmailTaken
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        AuthError::Unauthorized(e)
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingField { .. } | AuthError::MalformedBody => StatusCode::BAD_REQUEST,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::MissingOrMalformedHeader
            | AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AuthError::Internal(e) => {
                error!(error = %e, status = status.as_u16(), "request failed")
            }
            AuthError::Unauthorized(cause) => {
                warn!(cause = %cause, status = status.as_u16(), "request failed")
            }
            other => warn!(error = %other, status = status.as_u16(), "request failed"),
        }

        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
