//! Process configuration.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. `stockroom.toml` in the working directory (optional)
//! 3. `STOCKROOM_*` environment variables, `__` separating sections
//!    (`STOCKROOM_SERVER__PORT=9000`, `STOCKROOM_DATABASE__URL=postgres://…`)
//!
//! `JWT_SECRET` and `DATABASE_URL` are read when the prefixed variables are
//! absent.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use stockroom_observability::LogOptions;

use crate::retry::RetryPolicy;

/// Secret used when nothing is configured. Only fit for local development.
pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LogOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres URL. Without one the in-memory store is used.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
    /// Use Postgres when a URL is configured.
    #[serde(default = "default_use_persistent")]
    pub use_persistent: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_seconds() -> u64 {
    30
}

fn default_use_persistent() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    50
}

fn default_max_delay_ms() -> u64 {
    2_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout_seconds(),
            use_persistent: default_use_persistent(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl AppConfig {
    /// Load from `stockroom.toml` and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let env = Environment::with_prefix("STOCKROOM")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        let settings = Config::builder()
            .add_source(File::with_name("stockroom").required(false))
            .add_source(env)
            .build()?;

        Self::from_config(settings, |key| std::env::var(key).ok())
    }

    /// Deserialize `settings`, then apply the unprefixed fallbacks looked up
    /// through `lookup`.
    pub fn from_config(
        settings: Config,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let explicit_secret = settings.get_string("auth.jwt_secret").is_ok();
        let explicit_url = settings.get_string("database.url").is_ok();

        let mut cfg: AppConfig = settings.try_deserialize()?;

        if !explicit_secret {
            if let Some(secret) = lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
                cfg.auth.jwt_secret = secret;
            }
        }
        if !explicit_url {
            cfg.database.url = lookup("DATABASE_URL").filter(|s| !s.is_empty());
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret cannot be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::Message("retry.multiplier must be >= 1.0".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// The Postgres URL to use, if persistence is enabled and configured.
    pub fn database_url(&self) -> Option<&str> {
        if self.database.use_persistent {
            self.database.url.as_deref()
        } else {
            None
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            multiplier: self.retry.multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str, env: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        let env: Vec<(String, String)> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_config(settings, move |key| {
            env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
    }

    #[test]
    fn empty_sources_yield_defaults() {
        let cfg = from_toml("", &[]).unwrap();
        assert_eq!(cfg.bind_address(), "0.0.0.0:8080");
        assert!(cfg.uses_dev_secret());
        assert_eq!(cfg.database_url(), None);
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
        assert_eq!(cfg.logging, LogOptions::default());
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = from_toml(
            r#"
            [server]
            port = 9100

            [database]
            url = "postgres://localhost/stockroom"
            max_connections = 4

            [retry]
            max_attempts = 5

            [logging]
            format = "pretty"
            "#,
            &[],
        )
        .unwrap();

        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.database.max_connections, 4);
        assert_eq!(cfg.database_url(), Some("postgres://localhost/stockroom"));
        assert_eq!(cfg.retry_policy().max_attempts, 5);
        assert_eq!(cfg.logging.format, stockroom_observability::LogFormat::Pretty);
    }

    #[test]
    fn unprefixed_fallbacks_apply_only_when_unset() {
        let cfg = from_toml(
            "",
            &[("JWT_SECRET", "s3cret"), ("DATABASE_URL", "postgres://env/db")],
        )
        .unwrap();
        assert_eq!(cfg.auth.jwt_secret, "s3cret");
        assert_eq!(cfg.database_url(), Some("postgres://env/db"));

        let cfg = from_toml(
            "[auth]\njwt_secret = \"from-file\"",
            &[("JWT_SECRET", "ignored")],
        )
        .unwrap();
        assert_eq!(cfg.auth.jwt_secret, "from-file");
    }

    #[test]
    fn persistence_can_be_switched_off() {
        let cfg = from_toml(
            "[database]\nurl = \"postgres://x/y\"\nuse_persistent = false",
            &[],
        )
        .unwrap();
        assert_eq!(cfg.database_url(), None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(from_toml("[database]\nmax_connections = 0", &[]).is_err());
        assert!(from_toml("[retry]\nmultiplier = 0.5", &[]).is_err());
    }
}
