//! Configuration handling for the animals API.
//!
//! Process-level settings come from CLI arguments and environment variables
//! via `clap`. Database settings are read from the environment on every
//! connection attempt through an [`EnvSource`].

use crate::error::{DbError, DbResult};
use clap::Parser;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_DB_PORT: u16 = 5432;

pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";
pub const ENV_DB_USERNAME: &str = "DB_USERNAME";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const ENV_SSL_ROOT_CERT: &str = "DB_SSL_ROOT_CERT";

/// Source of environment values.
///
/// Empty values are reported as unset.
pub trait EnvSource: Send + Sync + fmt::Debug {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

fn required(env: &dyn EnvSource, key: &str) -> DbResult<String> {
    env.var(key)
        .ok_or_else(|| DbError::configuration(format!("{} environment variable is not set", key)))
}

/// Static database settings, re-read from the environment on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub database: String,
}

impl DatabaseSettings {
    /// Read `DB_HOST`, `DB_PORT`, `DB_USERNAME` and `DB_NAME`.
    pub fn from_env(env: &dyn EnvSource) -> DbResult<Self> {
        let host = required(env, ENV_DB_HOST)?;
        let port = match env.var(ENV_DB_PORT) {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_DB_PORT,
        };
        let username = required(env, ENV_DB_USERNAME)?;
        let database = required(env, ENV_DB_NAME)?;

        Ok(Self {
            host,
            port,
            username,
            database,
        })
    }
}

fn parse_port(raw: &str) -> DbResult<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(DbError::configuration(format!(
            "{} must be a positive integer below 65536, got '{}'",
            ENV_DB_PORT, raw
        ))),
        Ok(port) => Ok(port),
    }
}

/// Configuration for the animals API process.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "animals-api",
    about = "Serverless CRUD API over an animals table with IAM-authenticated PostgreSQL access",
    version,
    author
)]
pub struct Config {
    /// PEM bundle with the CA certificates trusted for the database server
    /// (for RDS, the regional certificate bundle). Uses the TLS backend's
    /// default roots when unset.
    #[arg(long, value_name = "PATH", env = ENV_SSL_ROOT_CERT)]
    pub ssl_root_cert: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            ssl_root_cert: None,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            (ENV_DB_HOST, "db.example.internal"),
            (ENV_DB_USERNAME, "app_user"),
            (ENV_DB_NAME, "zoo"),
        ])
    }

    #[test]
    fn test_settings_default_port() {
        let settings = DatabaseSettings::from_env(&full_env()).unwrap();
        assert_eq!(settings.port, DEFAULT_DB_PORT);
        assert_eq!(settings.host, "db.example.internal");
        assert_eq!(settings.username, "app_user");
        assert_eq!(settings.database, "zoo");
    }

    #[test]
    fn test_settings_explicit_port() {
        let mut vars = full_env();
        vars.insert(ENV_DB_PORT.to_string(), "6543".to_string());
        let settings = DatabaseSettings::from_env(&vars).unwrap();
        assert_eq!(settings.port, 6543);
    }

    #[test]
    fn test_settings_rejects_invalid_port() {
        for bad in ["0", "-1", "abc", "70000"] {
            let mut vars = full_env();
            vars.insert(ENV_DB_PORT.to_string(), bad.to_string());
            let err = DatabaseSettings::from_env(&vars).unwrap_err();
            assert!(err.is_configuration(), "port {bad} should be rejected");
        }
    }

    #[test]
    fn test_settings_missing_values() {
        for key in [ENV_DB_HOST, ENV_DB_USERNAME, ENV_DB_NAME] {
            let mut vars = full_env();
            vars.remove(key);
            let err = DatabaseSettings::from_env(&vars).unwrap_err();
            assert!(err.is_configuration());
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn test_empty_value_counts_as_unset() {
        let mut vars = full_env();
        vars.insert(ENV_DB_HOST.to_string(), String::new());
        assert!(DatabaseSettings::from_env(&vars).is_err());
    }

    #[test]
    fn test_config_parse_defaults() {
        let config = Config::parse_from(["animals-api"]);
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_config_parse_root_cert() {
        let config =
            Config::parse_from(["animals-api", "--ssl-root-cert", "/etc/ssl/rds-bundle.pem"]);
        assert_eq!(
            config.ssl_root_cert,
            Some(PathBuf::from("/etc/ssl/rds-bundle.pem"))
        );
    }
}
