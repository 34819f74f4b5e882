use std::sync::Arc;

use tracing::{info, warn};

use super::{
    extractors::SessionAuthenticator,
    jwt::JwtKeys,
    registry::{is_valid_email, UserRegistry},
    repo_types::User,
};
use crate::{
    error::AuthError,
    qr::rotation::{SecretReader, SecretSnapshot},
};

/// A freshly minted token and the user it was minted for.
#[derive(Debug)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Entry point for every operation the HTTP layer exposes.
pub struct AuthService {
    registry: UserRegistry,
    keys: JwtKeys,
    authenticator: SessionAuthenticator,
    secret: SecretReader,
}

impl AuthService {
    pub fn new(registry: UserRegistry, keys: JwtKeys, secret: SecretReader) -> Self {
        let authenticator = SessionAuthenticator::new(keys.clone(), registry.clone());
        Self {
            registry,
            keys,
            authenticator,
            secret,
        }
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let user = self.registry.register(email, password, name).await?;
        let token = self.keys.issue(&user)?;
        Ok(AuthSession { token, user })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = self.registry.verify_credentials(email, password).await?;
        let token = self.keys.issue(&user)?;
        info!(user_id = %user.id, "user logged in");
        Ok(AuthSession { token, user })
    }

    /// An unknown subject surfaces as `NotFound` here.
    pub async fn current_user(&self, header: Option<&str>) -> Result<User, AuthError> {
        self.authenticator
            .authenticate(header)
            .await
            .map_err(|e| match e {
                AuthError::UnknownSubject => AuthError::NotFound,
                other => other,
            })
    }

    /// Same outcome whether or not the address is registered. No reset token is
    /// issued yet; a known address is only logged.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidInput("Invalid email format".into()));
        }
        match self.registry.find_by_email(email).await {
            Ok(Some(user)) => info!(user_id = %user.id, "password reset requested"),
            Ok(None) => {}
            // the caller still gets the generic answer
            Err(e) => warn!(error = %e, "password reset lookup failed"),
        }
        Ok(())
    }

    /// An unknown subject is treated like any other invalid token here.
    pub async fn current_secret(&self, header: Option<&str>) -> Result<Arc<SecretSnapshot>, AuthError> {
        self.authenticator
            .authenticate(header)
            .await
            .map_err(|e| match e {
                AuthError::UnknownSubject => AuthError::InvalidToken,
                other => other,
            })?;
        Ok(self.secret.current().await)
    }
}

#[cfg(test)]
pub(crate) fn test_service(secret: SecretReader) -> AuthService {
    use crate::config::JwtConfig;

    let keys = JwtKeys::new(&JwtConfig {
        secret: "test-secret".into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
    });
    AuthService::new(super::registry::test_registry(), keys, secret)
}
