//! Upsert handler: insert an animal or update it when the name exists.

use crate::db::Queryable;
use crate::handlers::{ApiRequest, ApiResponse, error_response};
use crate::models::{Animal, QueryParam};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

pub const UPSERT_SQL: &str = "INSERT INTO animals (name, weight, height) \
     VALUES ($1, $2, $3) \
     ON CONFLICT (name) DO UPDATE \
     SET weight = EXCLUDED.weight, height = EXCLUDED.height";

const REQUIRED_FIELDS: [&str; 3] = ["name", "weight", "height"];

/// Why a request payload cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Request body is required")]
    MissingBody,
    #[error("Body must be valid JSON")]
    InvalidJson,
    #[error("Body must be a JSON object")]
    NotAnObject,
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Weight and height must be numeric")]
    NotNumeric,
    #[error("Name must be a non-empty string")]
    BlankName,
}

pub async fn handle(db: &dyn Queryable, request: &ApiRequest) -> ApiResponse {
    let animal = match parse_payload(request) {
        Ok(animal) => animal,
        Err(e) => return ApiResponse::message(400, e),
    };

    let params = [
        QueryParam::from(animal.name.as_str()),
        QueryParam::Decimal(animal.weight),
        QueryParam::Decimal(animal.height),
    ];

    if let Err(e) = db.execute(UPSERT_SQL, Some(&params[..])).await {
        return error_response(&e);
    }

    info!(name = %animal.name, "Animal saved");
    ApiResponse::json(
        201,
        &serde_json::json!({ "message": "Animal saved", "item": animal }),
    )
}

/// Validate the request body into an [`Animal`].
pub fn parse_payload(request: &ApiRequest) -> Result<Animal, ValidationError> {
    let body = request.body.as_deref().ok_or(ValidationError::MissingBody)?;
    let payload: JsonValue =
        serde_json::from_str(body).map_err(|_| ValidationError::InvalidJson)?;
    let fields = payload.as_object().ok_or(ValidationError::NotAnObject)?;

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| !fields.contains_key(*f))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let weight = parse_decimal(&fields["weight"]).ok_or(ValidationError::NotNumeric)?;
    let height = parse_decimal(&fields["height"]).ok_or(ValidationError::NotNumeric)?;

    let name = match &fields["name"] {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.to_string(),
        _ => String::new(),
    };
    if name.is_empty() {
        return Err(ValidationError::BlankName);
    }

    Ok(Animal::new(name, weight, height))
}

/// Accept JSON numbers and numeric strings.
fn parse_decimal(value: &JsonValue) -> Option<Decimal> {
    let text = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
