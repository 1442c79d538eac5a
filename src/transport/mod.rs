//! Transport layer for the animals API.
//!
//! Transports deliver request envelopes to the handlers and return their
//! responses. The stdio transport reads one JSON invocation per line.

pub mod stdio;

pub use stdio::{Invocation, StdioTransport};

use crate::error::DbResult;
use std::future::Future;

/// Trait for invocation transports.
pub trait Transport: Send + Sync {
    /// Start the transport and begin handling requests.
    ///
    /// This method should block until the transport is shut down.
    fn run(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}
