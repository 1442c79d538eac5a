//! Stdio transport for the animals API.
//!
//! Reads newline-delimited JSON invocations from stdin:
//!
//! ```text
//! {"handler": "post", "event": {"body": "{\"name\":\"Fox\",\"weight\":4.2,\"height\":0.6}"}}
//! ```
//!
//! and writes one [`ApiResponse`] per line to stdout.

use crate::db::Queryable;
use crate::error::{DbError, DbResult};
use crate::handlers::{ApiRequest, ApiResponse, HandlerKind, dispatch};
use crate::transport::Transport;
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{debug, info, warn};

/// One handler invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct Invocation {
    pub handler: HandlerKind,
    #[serde(default)]
    pub event: ApiRequest,
}

/// Stdio transport implementation.
pub struct StdioTransport {
    db: Arc<dyn Queryable>,
}

impl StdioTransport {
    /// Create a new stdio transport over the given query interface.
    pub fn new(db: Arc<dyn Queryable>) -> Self {
        Self { db }
    }

    /// Handle one input line.
    pub async fn handle_line(&self, line: &str) -> ApiResponse {
        match serde_json::from_str::<Invocation>(line) {
            Ok(invocation) => {
                debug!(handler = %invocation.handler, "Dispatching invocation");
                dispatch(invocation.handler, self.db.as_ref(), &invocation.event).await
            }
            Err(e) => {
                warn!(error = %e, "Malformed invocation");
                ApiResponse::message(400, format!("Malformed invocation: {}", e))
            }
        }
    }

    /// Serve invocations until `reader` reaches end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> DbResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.map_err(io_error)? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = self.handle_line(line).await;
            let mut out = serde_json::to_vec(&response)
                .map_err(|e| DbError::internal(format!("Failed to encode response: {}", e)))?;
            out.push(b'\n');
            writer.write_all(&out).await.map_err(io_error)?;
            writer.flush().await.map_err(io_error)?;
        }
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> DbError {
    DbError::internal(format!("Stdio transport error: {}", e))
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting animals API with stdio transport");

        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();

        tokio::select! {
            result = self.serve(reader, writer) => {
                result?;
                info!("Stdio transport reached end of input");
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received");
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
