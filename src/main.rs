//! Animals API - Main entry point.
//!
//! Reads handler invocations from stdin and answers them against a
//! PostgreSQL database using IAM token authentication.

use animals_api::config::{Config, EnvSource, ProcessEnv};
use animals_api::db::{
    ConnectionFactory, QueryExecutor, RdsTokenGenerator, RegionResolver, TlsContext,
};
use animals_api::transport::{StdioTransport, Transport};
use aws_config::BehaviorVersion;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries responses.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        ssl_root_cert = ?config.ssl_root_cert,
        "Starting animals API v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Process-wide singletons, built once and shared by every invocation
    let env: Arc<dyn EnvSource> = Arc::new(ProcessEnv);
    let region = Arc::new(RegionResolver::new(env.clone()));
    let sdk_config = Arc::new(aws_config::load_defaults(BehaviorVersion::latest()).await);
    let tokens = Arc::new(RdsTokenGenerator::new(sdk_config, region));
    let tls = Arc::new(match &config.ssl_root_cert {
        Some(path) => TlsContext::with_root_cert(path),
        None => TlsContext::new(),
    });

    let factory = ConnectionFactory::new(env, tokens, tls);
    let executor = Arc::new(QueryExecutor::new(factory));

    let transport = StdioTransport::new(executor);
    info!(transport = transport.name(), "Using stdio transport");

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
