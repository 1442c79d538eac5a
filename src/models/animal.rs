//! The `animals` table record.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};

/// A row of the `animals` table.
///
/// Weight and height are stored as NUMERIC and kept as fixed-point values;
/// they are rendered as JSON floats only when serialized for a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Animal {
    pub name: String,
    #[serde(serialize_with = "decimal_as_f64")]
    pub weight: Decimal,
    #[serde(serialize_with = "decimal_as_f64")]
    pub height: Decimal,
}

impl Animal {
    pub fn new(name: impl Into<String>, weight: Decimal, height: Decimal) -> Self {
        Self {
            name: name.into(),
            weight,
            height,
        }
    }
}

/// Lossy conversion used at the response boundary.
pub fn decimal_to_f64(value: &Decimal) -> Option<f64> {
    value.to_f64()
}

fn decimal_as_f64<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    match decimal_to_f64(value) {
        Some(f) => serializer.serialize_f64(f),
        None => serializer.serialize_str(&value.to_string()),
    }
}
