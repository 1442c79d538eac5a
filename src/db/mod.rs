//! Database access layer.
//!
//! This module provides database access functionality:
//! - Region resolution (cached for the process lifetime)
//! - IAM auth token generation (fresh per connection)
//! - Connection factory (one TLS connection per call, no pooling)
//! - Query execution with guaranteed connection close
//! - Parameter binding and row materialization

pub mod connection;
pub mod executor;
pub mod params;
pub mod region;
pub mod token;
pub mod types;

pub use connection::{ConnectionFactory, ConnectionParameters, TlsContext};
pub use executor::{QueryExecutor, Queryable};
pub use region::{Region, RegionResolver};
pub use token::{AuthToken, RdsTokenGenerator, StaticToken, TokenProvider};
