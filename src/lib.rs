//! Animals API Library
//!
//! This library provides a small CRUD API over an `animals` table stored in
//! PostgreSQL. Connections authenticate with short-lived IAM tokens and are
//! opened per query over TLS.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod transport;

pub use config::Config;
pub use db::{QueryExecutor, Queryable};
pub use error::DbError;
pub use handlers::{ApiRequest, ApiResponse, HandlerKind};
