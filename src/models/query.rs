//! Query-related data models.
//!
//! This module defines positional bind parameters and the values produced
//! when result rows are materialized.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::ser::{Serialize, Serializer};
use serde_json::Value as JsonValue;

/// A parameter value for parameterized queries.
///
/// Parameters are always sent through the driver's bind mechanism and never
/// spliced into the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Fixed-point value, bound as NUMERIC
    Decimal(Decimal),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// JSON document, bound as JSONB
    Json(JsonValue),
}

impl QueryParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
        }
    }
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for QueryParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for QueryParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for QueryParam {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl<T: Into<QueryParam>> From<Option<T>> for QueryParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// A column value read back from the database.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// NUMERIC columns keep their exact fixed-point value.
    Decimal(Decimal),
    /// NUMERIC beyond the fixed-point range (or NaN/Infinity), as exact text.
    Numeric(String),
    /// Text, and anything rendered as text (timestamps, UUIDs).
    Text(String),
    Bytes(Vec<u8>),
    Json(JsonValue),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            Self::Int(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }
}

/// Decimals serialize as strings to keep their exact representation;
/// bytes serialize as base64.
impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use base64::{Engine as _, engine::general_purpose::STANDARD};

        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Decimal(v) => serializer.serialize_str(&v.to_string()),
            Self::Numeric(v) => serializer.serialize_str(v),
            Self::Text(v) => serializer.serialize_str(v),
            Self::Bytes(v) => serializer.serialize_str(&STANDARD.encode(v)),
            Self::Json(v) => v.serialize(serializer),
        }
    }
}

/// One result row: column name to value, in the query's output order.
pub type Row = IndexMap<String, SqlValue>;
