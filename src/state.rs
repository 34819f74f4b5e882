use std::sync::Arc;

use anyhow::Context;

use crate::auth::{
    jwt::JwtKeys,
    password::PasswordHasher,
    registry::UserRegistry,
    repo::{InMemoryUserRepository, UserRepository},
    services::AuthService,
};
use crate::config::{AppConfig, ROTATION_PERIOD};
use crate::qr::rotation::{RotatingSecretGenerator, RotationTask, SecretReader};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AuthService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Production wiring: volatile user store and a rotation task on the fixed period.
    /// Must run inside a tokio runtime.
    pub fn init(config: AppConfig) -> anyhow::Result<(Self, RotationTask)> {
        let generator = RotatingSecretGenerator::new();
        let state = Self::from_parts(
            config,
            Arc::new(InMemoryUserRepository::new()),
            generator.reader(),
        )?;
        let rotation = generator.start(ROTATION_PERIOD);
        Ok((state, rotation))
    }

    pub fn from_parts(
        config: AppConfig,
        repo: Arc<dyn UserRepository>,
        secret: SecretReader,
    ) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::with_params(config.hash.params()?);
        let registry = UserRegistry::new(repo, hasher).context("initialise user registry")?;
        let keys = JwtKeys::new(&config.jwt);

        Ok(Self {
            service: AuthService::new(registry, keys, secret).into_shared(),
            config: Arc::new(config),
        })
    }
}
