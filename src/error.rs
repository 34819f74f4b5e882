use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::{jwt::TokenError, password::PasswordError, repo::RepoError};

/// Outcome of every service operation that is not a success.
///
/// Variants that share a client-facing message are still separate here so the
/// server log can tell them apart.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("user already exists")]
    DuplicateUser,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("expired token")]
    ExpiredToken,

    #[error("token subject does not resolve to a user")]
    UnknownSubject,

    #[error("user not found")]
    NotFound,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateUser => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::UnknownSubject => {
                StatusCode::FORBIDDEN
            }
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Configuration(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text sent to the client. Never carries internal detail.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::InvalidInput(msg) => msg.clone(),
            AuthError::DuplicateUser => "User already exists".into(),
            AuthError::InvalidCredentials => "Invalid credentials".into(),
            AuthError::MissingToken => "Access token required".into(),
            AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::UnknownSubject => {
                "Invalid or expired token".into()
            }
            AuthError::NotFound => "User not found".into(),
            AuthError::Configuration(_) | AuthError::Internal(_) => {
                "Internal server error".into()
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Configuration(_) | AuthError::Internal(_) = &self {
            error!(error = %self, "request failed");
        }
        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::HashingFailed(msg) => AuthError::Internal(msg),
            PasswordError::MalformedHash(msg) => AuthError::Configuration(msg),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Encoding(msg) => AuthError::Internal(msg),
            TokenError::Malformed(_) => AuthError::InvalidToken,
            TokenError::Expired => AuthError::ExpiredToken,
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::DuplicateEmail => AuthError::DuplicateUser,
            RepoError::Storage(msg) => AuthError::Internal(msg),
        }
    }
}

/// JSON body for any error status, shared by the fallback and panic handlers.
pub fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
