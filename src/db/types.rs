//! PostgreSQL type mappings.
//!
//! Result rows are materialized into [`Row`] maps in two phases:
//! 1. `TypeCategory` classifies the column's type name
//! 2. A per-category decoder extracts the value as a [`SqlValue`]
//!
//! Values arrive in text format for unparameterized statements and in binary
//! format for bound ones; both are handled. Types without a dedicated decoder
//! fall back to their text form. A decoder failure on a recognized type is an
//! error; a value is never silently replaced by NULL.

use crate::error::{DbError, DbResult};
use crate::models::{Row, SqlValue};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::types::{Oid, PgInterval, PgTimeTz};
use sqlx::postgres::{PgRow, PgValueFormat, PgValueRef};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::fmt::Write as _;
use tracing::debug;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for PostgreSQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Oid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    TimeTz,
    Interval,
    Array,
    Unknown,
}

/// Classify a PostgreSQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();
    if lower.ends_with("[]") {
        return TypeCategory::Array;
    }

    match lower.as_str() {
        "numeric" | "decimal" => TypeCategory::Decimal,
        "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" => TypeCategory::Integer,
        "float4" | "float8" | "real" | "double precision" => TypeCategory::Float,
        "bool" | "boolean" => TypeCategory::Boolean,
        "text" | "varchar" | "character varying" | "bpchar" | "char" | "character" | "name"
        | "citext" => TypeCategory::Text,
        "bytea" => TypeCategory::Binary,
        "json" | "jsonb" => TypeCategory::Json,
        "uuid" => TypeCategory::Uuid,
        "oid" => TypeCategory::Oid,
        "timestamp" => TypeCategory::Timestamp,
        "timestamptz" => TypeCategory::TimestampTz,
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        "timetz" => TypeCategory::TimeTz,
        "interval" => TypeCategory::Interval,
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Row Materialization
// =============================================================================

/// Convert one result row into a column-name to value map.
pub fn row_to_map(row: &PgRow) -> DbResult<Row> {
    let mut map = Row::with_capacity(row.columns().len());
    for (idx, col) in row.columns().iter().enumerate() {
        let type_name = col.type_info().name();
        let value = decode_column(row, idx, type_name, categorize_type(type_name))?;
        map.insert(col.name().to_string(), value);
    }
    Ok(map)
}

/// Convert a full result set, preserving row order.
pub fn rows_to_maps(rows: &[PgRow]) -> DbResult<Vec<Row>> {
    rows.iter().map(row_to_map).collect()
}

fn decode_column(
    row: &PgRow,
    idx: usize,
    type_name: &str,
    category: TypeCategory,
) -> DbResult<SqlValue> {
    let raw = row.try_get_raw(idx).map_err(DbError::from)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    // The server already rendered these; keep its text verbatim.
    let text_native = matches!(
        category,
        TypeCategory::TimeTz
            | TypeCategory::Interval
            | TypeCategory::Array
            | TypeCategory::Unknown
    );
    if text_native && raw.format() == PgValueFormat::Text {
        return raw_text(&raw, idx).map(SqlValue::Text);
    }

    let value = match category {
        TypeCategory::Integer => decode_integer(row, idx, type_name)?,
        TypeCategory::Float => decode_float(row, idx, type_name)?,
        TypeCategory::Decimal => return decode_decimal(row, idx, &raw),
        TypeCategory::Boolean => get::<bool>(row, idx)?.map(SqlValue::Bool),
        TypeCategory::Text => get::<String>(row, idx)?.map(SqlValue::Text),
        TypeCategory::Binary => get::<Vec<u8>>(row, idx)?.map(SqlValue::Bytes),
        TypeCategory::Json => get::<JsonValue>(row, idx)?.map(SqlValue::Json),
        TypeCategory::Uuid => get::<uuid::Uuid>(row, idx)?.map(|v| SqlValue::Text(v.to_string())),
        TypeCategory::Oid => get::<Oid>(row, idx)?.map(|v| SqlValue::Int(i64::from(v.0))),
        TypeCategory::Timestamp => {
            get::<NaiveDateTime>(row, idx)?.map(|v| SqlValue::Text(v.to_string()))
        }
        TypeCategory::TimestampTz => {
            get::<DateTime<Utc>>(row, idx)?.map(|v| SqlValue::Text(v.to_rfc3339()))
        }
        TypeCategory::Date => get::<NaiveDate>(row, idx)?.map(|v| SqlValue::Text(v.to_string())),
        TypeCategory::Time => get::<NaiveTime>(row, idx)?.map(|v| SqlValue::Text(v.to_string())),
        TypeCategory::TimeTz => get::<PgTimeTz<NaiveTime, FixedOffset>>(row, idx)?
            .map(|v| SqlValue::Text(format!("{}{}", v.time, v.offset))),
        TypeCategory::Interval => get::<PgInterval>(row, idx)?
            .map(|v| SqlValue::Text(format_interval(v.months, v.days, v.microseconds))),
        TypeCategory::Array => match decode_array(row, idx, type_name)? {
            Some(value) => Some(value),
            None => Some(binary_fallback(&raw, idx, type_name)?),
        },
        TypeCategory::Unknown => Some(binary_fallback(&raw, idx, type_name)?),
    };
    Ok(value.unwrap_or(SqlValue::Null))
}

fn get<'r, T>(row: &'r PgRow, idx: usize) -> DbResult<Option<T>>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(idx).map_err(DbError::from)
}

fn raw_text(raw: &PgValueRef<'_>, idx: usize) -> DbResult<String> {
    raw.as_str()
        .map(str::to_string)
        .map_err(|e| DbError::query(format!("Failed to decode column {}: {}", idx, e), None))
}

fn raw_bytes<'r>(raw: &PgValueRef<'r>, idx: usize) -> DbResult<&'r [u8]> {
    raw.as_bytes()
        .map_err(|e| DbError::query(format!("Failed to decode column {}: {}", idx, e), None))
}

fn decode_integer(row: &PgRow, idx: usize, type_name: &str) -> DbResult<Option<SqlValue>> {
    let value = match type_name.to_lowercase().as_str() {
        "int2" | "smallint" => get::<i16>(row, idx)?.map(i64::from),
        "int4" | "integer" => get::<i32>(row, idx)?.map(i64::from),
        _ => get::<i64>(row, idx)?,
    };
    Ok(value.map(SqlValue::Int))
}

fn decode_float(row: &PgRow, idx: usize, type_name: &str) -> DbResult<Option<SqlValue>> {
    let value = match type_name.to_lowercase().as_str() {
        "float4" | "real" => get::<f32>(row, idx)?.map(f64::from),
        _ => get::<f64>(row, idx)?,
    };
    Ok(value.map(SqlValue::Float))
}

/// NUMERIC that fits [`Decimal`] stays fixed-point; anything else (huge
/// magnitudes, NaN, infinities) is kept as its exact text.
fn decode_decimal(row: &PgRow, idx: usize, raw: &PgValueRef<'_>) -> DbResult<SqlValue> {
    match get::<Decimal>(row, idx) {
        Ok(value) => Ok(value.map(SqlValue::Decimal).unwrap_or(SqlValue::Null)),
        Err(err) => {
            let exact = match raw.format() {
                PgValueFormat::Text => Some(raw_text(raw, idx)?),
                PgValueFormat::Binary => numeric_to_string(raw_bytes(raw, idx)?),
            };
            match exact {
                Some(text) => {
                    debug!(column = idx, value = %text, "NUMERIC outside fixed-point range");
                    Ok(SqlValue::Numeric(text))
                }
                None => Err(err),
            }
        }
    }
}

/// Binary-format arrays of common element types, as a JSON array.
/// `None` when the element type has no dedicated decoder.
fn decode_array(row: &PgRow, idx: usize, type_name: &str) -> DbResult<Option<SqlValue>> {
    fn to_json<T: Into<JsonValue>>(items: Vec<Option<T>>) -> SqlValue {
        SqlValue::Json(JsonValue::Array(
            items.into_iter().map(|v| v.map_or(JsonValue::Null, Into::into)).collect(),
        ))
    }

    let element = type_name.trim_end_matches("[]").to_lowercase();
    let value = match (categorize_type(&element), element.as_str()) {
        (TypeCategory::Integer, "int2" | "smallint") => get::<Vec<Option<i16>>>(row, idx)?.map(to_json),
        (TypeCategory::Integer, "int4" | "integer") => get::<Vec<Option<i32>>>(row, idx)?.map(to_json),
        (TypeCategory::Integer, _) => get::<Vec<Option<i64>>>(row, idx)?.map(to_json),
        (TypeCategory::Float, "float4" | "real") => get::<Vec<Option<f32>>>(row, idx)?.map(to_json),
        (TypeCategory::Float, _) => get::<Vec<Option<f64>>>(row, idx)?.map(to_json),
        (TypeCategory::Boolean, _) => get::<Vec<Option<bool>>>(row, idx)?.map(to_json),
        (TypeCategory::Text, _) => get::<Vec<Option<String>>>(row, idx)?.map(to_json),
        (TypeCategory::Decimal, _) => get::<Vec<Option<Decimal>>>(row, idx)?
            .map(|items| to_json(items.into_iter().map(|d| d.map(|d| d.to_string())).collect())),
        _ => return Ok(None),
    };
    Ok(value)
}

/// Binary value of a type without a dedicated decoder: text when it is
/// printable UTF-8 (enums, domains over text), raw bytes otherwise.
fn binary_fallback(raw: &PgValueRef<'_>, idx: usize, type_name: &str) -> DbResult<SqlValue> {
    let bytes = raw_bytes(raw, idx)?;
    debug!(column = idx, type_name = %type_name, "No dedicated decoder, using fallback");
    Ok(match std::str::from_utf8(bytes) {
        Ok(text) if is_printable(text) => SqlValue::Text(text.to_string()),
        _ => SqlValue::Bytes(bytes.to_vec()),
    })
}

fn is_printable(text: &str) -> bool {
    text.chars().all(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
}

// =============================================================================
// Text Rendering
// =============================================================================

/// Render a binary NUMERIC exactly, the way the server prints it.
///
/// Layout: `ndigits`, `weight`, `sign`, `dscale` (all 16-bit big endian)
/// followed by `ndigits` base-10000 digits.
pub fn numeric_to_string(bytes: &[u8]) -> Option<String> {
    let word = |at: usize| -> Option<u16> {
        Some(u16::from_be_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]))
    };

    let ndigits = usize::from(word(0)?);
    let weight = i32::from(word(2)? as i16);
    let sign = word(4)?;
    let dscale = usize::from(word(6)?);
    if bytes.len() != 8 + 2 * ndigits {
        return None;
    }

    match sign {
        0xC000 => return Some("NaN".to_string()),
        0xD000 => return Some("Infinity".to_string()),
        0xF000 => return Some("-Infinity".to_string()),
        0x0000 | 0x4000 => {}
        _ => return None,
    }

    let digits = (0..ndigits)
        .map(|i| word(8 + 2 * i).filter(|d| *d < 10_000))
        .collect::<Option<Vec<u16>>>()?;
    // Digit `i` carries the power 10000^(weight - i).
    let digit_at = |power: i32| -> u16 {
        usize::try_from(weight - power)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        let _ = write!(out, "{}", digit_at(weight));
        for power in (0..weight).rev() {
            let _ = write!(out, "{:04}", digit_at(power));
        }
    }

    if dscale > 0 {
        let mut fraction = String::new();
        let mut power = -1;
        while fraction.len() < dscale {
            let _ = write!(fraction, "{:04}", digit_at(power));
            power -= 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }
    Some(out)
}

/// Render an interval in the server's default output style,
/// e.g. `1 year 2 mons 3 days 04:05:06.5`.
pub fn format_interval(months: i32, days: i32, microseconds: i64) -> String {
    fn plural(n: i64, unit: &str) -> String {
        if n == 1 {
            format!("{} {}", n, unit)
        } else {
            format!("{} {}s", n, unit)
        }
    }

    let mut parts = Vec::new();
    let (years, mons) = (i64::from(months / 12), i64::from(months % 12));
    if years != 0 {
        parts.push(plural(years, "year"));
    }
    if mons != 0 {
        parts.push(plural(mons, "mon"));
    }
    if days != 0 {
        parts.push(plural(i64::from(days), "day"));
    }

    if microseconds != 0 || parts.is_empty() {
        let total = microseconds.unsigned_abs();
        let (secs, micros) = (total / 1_000_000, total % 1_000_000);
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            if microseconds < 0 { "-" } else { "" },
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        if micros != 0 {
            let fraction = format!("{:06}", micros);
            clock.push('.');
            clock.push_str(fraction.trim_end_matches('0'));
        }
        parts.push(clock);
    }

    parts.join(" ")
}
