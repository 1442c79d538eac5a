//! Connection factory.
//!
//! Builds connection parameters from the environment plus a freshly minted
//! token and opens one TLS-secured PostgreSQL connection per call. Nothing is
//! pooled or memoized.

use crate::config::{DatabaseSettings, EnvSource};
use crate::db::token::{AuthToken, TokenProvider};
use crate::error::{DbError, DbResult};
use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared TLS settings. Certificate and hostname verification are always on.
#[derive(Debug, Clone, Default)]
pub struct TlsContext {
    root_cert: Option<PathBuf>,
}

impl TlsContext {
    /// Verify against the TLS backend's default trust roots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify against the CA bundle at `path`.
    pub fn with_root_cert(path: impl Into<PathBuf>) -> Self {
        Self {
            root_cert: Some(path.into()),
        }
    }

    pub fn root_cert(&self) -> Option<&Path> {
        self.root_cert.as_deref()
    }

    pub fn ssl_mode(&self) -> PgSslMode {
        PgSslMode::VerifyFull
    }

    fn apply(&self, options: PgConnectOptions) -> PgConnectOptions {
        let options = options.ssl_mode(self.ssl_mode());
        match &self.root_cert {
            Some(path) => options.ssl_root_cert(path),
            None => options,
        }
    }
}

/// Everything needed to open one connection.
#[derive(Debug, Clone)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub token: AuthToken,
    pub tls: Arc<TlsContext>,
}

impl ConnectionParameters {
    /// Driver options; the token is passed as the password.
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(self.token.expose())
            .database(&self.database)
            .application_name(env!("CARGO_PKG_NAME"));
        self.tls.apply(options)
    }
}

/// Opens a new, exclusively owned connection per call.
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    env: Arc<dyn EnvSource>,
    tokens: Arc<dyn TokenProvider>,
    tls: Arc<TlsContext>,
}

impl ConnectionFactory {
    pub fn new(
        env: Arc<dyn EnvSource>,
        tokens: Arc<dyn TokenProvider>,
        tls: Arc<TlsContext>,
    ) -> Self {
        Self { env, tokens, tls }
    }

    /// Read settings and mint a token. Called for every connection.
    pub async fn build_parameters(&self) -> DbResult<ConnectionParameters> {
        let settings = DatabaseSettings::from_env(self.env.as_ref())?;
        let token = self
            .tokens
            .generate(&settings.host, settings.port, &settings.username)
            .await?;

        Ok(ConnectionParameters {
            host: settings.host,
            port: settings.port,
            database: settings.database,
            username: settings.username,
            token,
            tls: self.tls.clone(),
        })
    }

    /// Open a connection. The caller owns it and must close it.
    pub async fn open(&self) -> DbResult<PgConnection> {
        let params = self.build_parameters().await?;

        debug!(
            host = %params.host,
            port = params.port,
            database = %params.database,
            username = %params.username,
            "Opening database connection"
        );

        let connection = params
            .connect_options()
            .connect()
            .await
            .map_err(|e| connect_error(&params, e))?;

        info!(host = %params.host, database = %params.database, "Database connection established");
        Ok(connection)
    }
}

fn connect_error(params: &ConnectionParameters, err: sqlx::Error) -> DbError {
    DbError::connectivity(
        format!(
            "Failed to connect to {}:{}/{} as {}: {}",
            params.host, params.port, params.database, params.username, err
        ),
        err,
    )
}
