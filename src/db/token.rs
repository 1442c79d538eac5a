//! IAM authentication token generation.
//!
//! Every connection attempt gets a freshly minted token. Tokens are short
//! lived, so nothing here caches them.

use crate::db::region::RegionResolver;
use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_rds::auth_token::{AuthTokenGenerator, Config as AuthTokenConfig};
use aws_sdk_rds::config::Region as AwsRegion;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A short-lived database credential, used as the connection password.
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***REDACTED***)")
    }
}

/// Mints a token for a host/port/username tuple.
#[async_trait]
pub trait TokenProvider: Send + Sync + fmt::Debug {
    async fn generate(&self, host: &str, port: u16, username: &str) -> DbResult<AuthToken>;
}

fn validate_target(host: &str, port: u16, username: &str) -> DbResult<()> {
    if host.is_empty() {
        return Err(DbError::configuration("Database host must not be empty"));
    }
    if port == 0 {
        return Err(DbError::configuration("Database port must be positive"));
    }
    if username.is_empty() {
        return Err(DbError::configuration("Database username must not be empty"));
    }
    Ok(())
}

/// RDS IAM token generator backed by the shared AWS SDK configuration.
pub struct RdsTokenGenerator {
    sdk_config: Arc<SdkConfig>,
    region: Arc<RegionResolver>,
}

impl RdsTokenGenerator {
    pub fn new(sdk_config: Arc<SdkConfig>, region: Arc<RegionResolver>) -> Self {
        Self { sdk_config, region }
    }
}

impl fmt::Debug for RdsTokenGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RdsTokenGenerator")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for RdsTokenGenerator {
    async fn generate(&self, host: &str, port: u16, username: &str) -> DbResult<AuthToken> {
        validate_target(host, port, username)?;
        let region = self.region.resolve()?;

        debug!(host = %host, port, username = %username, region = %region, "Generating IAM auth token");

        let config = AuthTokenConfig::builder()
            .hostname(host)
            .port(u64::from(port))
            .username(username)
            .region(AwsRegion::new(region.as_str().to_string()))
            .build()
            .map_err(|e| {
                DbError::connectivity("Failed to configure IAM auth token request", e)
            })?;

        let token = AuthTokenGenerator::new(config)
            .auth_token(&self.sdk_config)
            .await
            .map_err(|e| DbError::connectivity("Failed to generate IAM auth token", e))?;

        if token.as_str().is_empty() {
            return Err(DbError::connectivity_msg(
                "Credential service returned an empty IAM auth token",
            ));
        }

        Ok(AuthToken::new(token.as_str()))
    }
}

/// Fixed credential, for password-authenticated servers in development and tests.
#[derive(Debug)]
pub struct StaticToken {
    token: AuthToken,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AuthToken::new(token),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn generate(&self, host: &str, port: u16, username: &str) -> DbResult<AuthToken> {
        validate_target(host, port, username)?;
        Ok(self.token.clone())
    }
}
