use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::{claims::Claims, repo_types::User};
use crate::config::{JwtConfig, TOKEN_TTL};

#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Encoding(String),

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,
}

/// Signs and verifies HS256 bearer tokens with the process-wide key.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self::with_ttl(config, TOKEN_TTL)
    }

    pub fn with_ttl(config: &JwtConfig, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, user: &User, now: OffsetDateTime) -> Result<String, TokenError> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        debug!(user_id = %user.id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Signature, issuer and audience are checked by `jsonwebtoken`; expiry is
    /// checked here against `now` with no leeway.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?
            .claims;

        if claims.is_expired_at(now.unix_timestamp()) {
            debug!(user_id = %claims.sub, "jwt expired");
            return Err(TokenError::Expired);
        }
        debug!(user_id = %claims.sub, "jwt verified");
        Ok(claims)
    }
}
