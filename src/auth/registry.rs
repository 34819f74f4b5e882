use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{
    password::{PasswordError, PasswordHasher},
    repo::UserRepository,
    repo_types::{NewUser, User},
};
use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_string()
}

/// User records plus the password hashing that guards them.
#[derive(Clone)]
pub struct UserRegistry {
    repo: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    // Verified against when the email is unknown, so both login failures cost the same.
    decoy_hash: Arc<str>,
}

impl UserRegistry {
    pub fn new(repo: Arc<dyn UserRepository>, hasher: PasswordHasher) -> Result<Self, PasswordError> {
        let decoy_hash = hasher.hash(&Uuid::new_v4().to_string())?;
        Ok(Self {
            repo,
            hasher,
            decoy_hash: decoy_hash.into(),
        })
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<User, AuthError> {
        if !is_valid_email(email) {
            warn!("register rejected: invalid email");
            return Err(AuthError::InvalidInput("Invalid email format".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            warn!("register rejected: password too short");
            return Err(AuthError::InvalidInput(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        // Skip the expensive hash for the common duplicate case; `create` still
        // settles races between concurrent registrations.
        if self.repo.find_by_email(email).await?.is_some() {
            warn!("register rejected: email already registered");
            return Err(AuthError::DuplicateUser);
        }

        let password_hash = self.hash(password).await?;
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => default_name(email),
        };

        let user = self
            .repo
            .create(NewUser {
                email: email.to_string(),
                name,
                password_hash,
            })
            .await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, AuthError> {
        match self.repo.find_by_email(email).await? {
            Some(user) => {
                if self.verify(password, &user.password_hash).await? {
                    Ok(user)
                } else {
                    warn!(user_id = %user.id, "login invalid password");
                    Err(AuthError::InvalidCredentials)
                }
            }
            None => {
                let _ = self.verify(password, &self.decoy_hash).await?;
                warn!("login unknown email");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.repo.find_by_email(email).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.repo.find_by_id(id).await?)
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hash task failed: {e}")))??;
        debug!("password hashed");
        Ok(hash)
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verify task failed: {e}")))??;
        Ok(ok)
    }
}

#[cfg(test)]
pub(crate) fn test_registry() -> UserRegistry {
    use crate::auth::{password::cheap_hasher, repo::InMemoryUserRepository};
    UserRegistry::new(Arc::new(InMemoryUserRepository::new()), cheap_hasher())
        .expect("registry")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn register_stores_hash_not_password() {
        let registry = test_registry();
        let user = registry.register("a@b.com", "secret1", None).await.expect("register");
        assert_ne!(user.password_hash, "secret1");
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert_eq!(user.name, "a");
    }

    #[tokio::test]
    async fn register_uses_given_name_and_defaults_blank_name() {
        let registry = test_registry();
        let named = registry
            .register("jane@x.com", "secret1", Some("Jane"))
            .await
            .expect("register");
        assert_eq!(named.name, "Jane");
        let blank = registry
            .register("joe@x.com", "secret1", Some(""))
            .await
            .expect("register");
        assert_eq!(blank.name, "joe");
    }

    #[tokio::test]
    async fn register_validates_input() {
        let registry = test_registry();
        let err = registry.register("not-an-email", "secret1", None).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(ref m) if m == "Invalid email format"));

        let err = registry.register("a@b.com", "12345", None).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(ref m) if m.contains("at least 6")));

        // length counts characters, not bytes
        assert!(registry.register("c@b.com", "ééééé", None).await.is_err());
        assert!(registry.register("d@b.com", "éééééé", None).await.is_ok());
    }

    #[tokio::test]
    async fn register_duplicate_email() {
        let registry = test_registry();
        registry.register("a@b.com", "secret1", None).await.expect("first");
        let err = registry
            .register("a@b.com", "different", Some("Other"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUser));
    }

    #[tokio::test]
    async fn verify_credentials_outcomes_are_indistinguishable() {
        let registry = test_registry();
        let user = registry.register("a@b.com", "secret1", None).await.expect("register");

        let ok = registry.verify_credentials("a@b.com", "secret1").await.expect("login");
        assert_eq!(ok.id, user.id);

        let wrong = registry.verify_credentials("a@b.com", "wrong!").await.unwrap_err();
        let unknown = registry.verify_credentials("x@b.com", "secret1").await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.public_message(), unknown.public_message());
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_configuration_error() {
        use crate::auth::{password::cheap_hasher, repo::InMemoryUserRepository};

        let repo = Arc::new(InMemoryUserRepository::new());
        repo.create(NewUser {
            email: "a@b.com".into(),
            name: "a".into(),
            password_hash: "garbage".into(),
        })
        .await
        .expect("create");
        let registry = UserRegistry::new(repo, cheap_hasher()).expect("registry");

        let err = registry.verify_credentials("a@b.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }
}
