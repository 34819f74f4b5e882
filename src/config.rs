use std::time::Duration;

use argon2::Params;
use serde::Deserialize;
use thiserror::Error;

/// Signing secret used when `APP_ENV` is not `production`. Never valid in production.
pub const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";

/// Tokens are valid for 24 hours from issuance.
pub const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// The rotating secret is replaced once per minute.
pub const ROTATION_PERIOD: Duration = Duration::from_secs(60);

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in production")]
    MissingSecret,

    #[error("JWT_SECRET is the development default; refusing to start in production")]
    DevSecretInProduction,

    #[error("JWT_SECRET must be at least {min} bytes in production, got {actual}")]
    WeakSecret { min: usize, actual: usize },

    #[error("JWT_SECRET must not be empty")]
    EmptySecret,

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("invalid argon2 parameters: {0}")]
    HashParams(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Argon2 work factor.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HashConfig {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl HashConfig {
    pub fn params(&self) -> Result<Params, ConfigError> {
        Params::new(self.m_cost, self.t_cost, self.p_cost, None)
            .map_err(|e| ConfigError::HashParams(e.to_string()))
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            None | Some("") | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "APP_ENV",
                    value: other.to_string(),
                })
            }
        };

        let secret = resolve_secret(environment, lookup("JWT_SECRET"))?;

        let jwt = JwtConfig {
            secret,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "qrpass".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "qrpass-clients".into()),
        };

        let defaults = HashConfig::default();
        let hash = HashConfig {
            m_cost: parse_or(&lookup, "ARGON2_M_COST", defaults.m_cost)?,
            t_cost: parse_or(&lookup, "ARGON2_T_COST", defaults.t_cost)?,
            p_cost: parse_or(&lookup, "ARGON2_P_COST", defaults.p_cost)?,
        };
        // Reject bad work factors at startup rather than on the first register.
        hash.params()?;

        let port = match lookup("APP_PORT") {
            Some(v) => parse_value("APP_PORT", v)?,
            None => parse_or(&lookup, "PORT", 3000)?,
        };

        Ok(Self {
            environment,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            jwt,
            hash,
        })
    }
}

fn resolve_secret(environment: Environment, secret: Option<String>) -> Result<String, ConfigError> {
    match (environment, secret) {
        (_, Some(s)) if s.is_empty() => Err(ConfigError::EmptySecret),
        (Environment::Production, None) => Err(ConfigError::MissingSecret),
        (Environment::Production, Some(s)) if s == DEV_JWT_SECRET => {
            Err(ConfigError::DevSecretInProduction)
        }
        (Environment::Production, Some(s)) if s.len() < MIN_PRODUCTION_SECRET_LEN => {
            Err(ConfigError::WeakSecret {
                min: MIN_PRODUCTION_SECRET_LEN,
                actual: s.len(),
            })
        }
        (Environment::Development, None) => {
            tracing::warn!("JWT_SECRET not set; using the development secret");
            Ok(DEV_JWT_SECRET.to_string())
        }
        (_, Some(s)) => Ok(s),
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(v) => parse_value(name, v),
        None => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue { name, value })
}
