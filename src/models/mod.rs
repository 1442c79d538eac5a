//! Data models for the animals API.
//!
//! This module re-exports all model types used throughout the application.

pub mod animal;
pub mod query;

// Re-export commonly used types
pub use animal::{Animal, decimal_to_f64};
pub use query::{QueryParam, Row, SqlValue};
