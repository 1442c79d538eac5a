//! List handler: every animal, ordered by name.

use crate::db::Queryable;
use crate::handlers::{ApiRequest, ApiResponse, error_response};
use crate::models::{Row, SqlValue, decimal_to_f64};
use serde_json::{Map, Value as JsonValue};

pub const LIST_SQL: &str = "SELECT name, weight, height FROM animals ORDER BY name ASC";

pub async fn handle(db: &dyn Queryable, _request: &ApiRequest) -> ApiResponse {
    match db.fetch_all(LIST_SQL, None).await {
        Ok(records) => {
            let items: Vec<JsonValue> = records.iter().map(record_to_json).collect();
            ApiResponse::json(200, &serde_json::json!({ "items": items }))
        }
        Err(e) => error_response(&e),
    }
}

/// Render a record for the response, with decimals as floats.
pub fn record_to_json(record: &Row) -> JsonValue {
    let map: Map<String, JsonValue> = record
        .iter()
        .map(|(key, value)| (key.clone(), value_to_json(value)))
        .collect();
    JsonValue::Object(map)
}

fn value_to_json(value: &SqlValue) -> JsonValue {
    match value {
        SqlValue::Decimal(d) => decimal_to_f64(d)
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(d.to_string())),
        SqlValue::Numeric(text) => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(text.clone())),
        other => serde_json::to_value(other).unwrap_or(JsonValue::Null),
    }
}
