use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::warn;

use super::{jwt::JwtKeys, registry::UserRegistry, repo_types::User};
use crate::error::AuthError;

/// Reads the raw `Authorization` value, if it is valid UTF-8.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())
}

/// Expects `Bearer <token>`; the scheme is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(char::is_whitespace)?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves a request's bearer token to a registered user.
#[derive(Clone)]
pub struct SessionAuthenticator {
    keys: JwtKeys,
    registry: UserRegistry,
}

impl SessionAuthenticator {
    pub fn new(keys: JwtKeys, registry: UserRegistry) -> Self {
        Self { keys, registry }
    }

    /// Takes the raw header value so callers and tests can pass synthetic input.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<User, AuthError> {
        let token = header.and_then(bearer_token).ok_or(AuthError::MissingToken)?;

        let claims = self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            AuthError::from(e)
        })?;

        match self.registry.find_by_id(claims.sub).await? {
            Some(user) => Ok(user),
            None => {
                warn!(user_id = %claims.sub, "token subject not found");
                Err(AuthError::UnknownSubject)
            }
        }
    }
}
