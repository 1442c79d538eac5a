//! Delete handler: remove an animal by name.

use crate::db::Queryable;
use crate::handlers::{ApiRequest, ApiResponse, error_response};
use crate::models::QueryParam;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::info;

pub const DELETE_SQL: &str = "DELETE FROM animals WHERE name = $1 RETURNING name";

pub async fn handle(db: &dyn Queryable, request: &ApiRequest) -> ApiResponse {
    let Some(name) = extract_name(request) else {
        return ApiResponse::message(400, "The name to delete must be provided.");
    };

    let params = [QueryParam::from(name.as_str())];
    match db.fetch_all(DELETE_SQL, Some(&params[..])).await {
        Ok(rows) if rows.is_empty() => {
            ApiResponse::message(404, format!("Animal '{}' not found.", name))
        }
        Ok(_) => {
            info!(name = %name, "Animal deleted");
            ApiResponse::empty(204)
        }
        Err(e) => error_response(&e),
    }
}

/// First non-blank `name` from path parameters, query string, then JSON body.
pub fn extract_name(request: &ApiRequest) -> Option<String> {
    let from_params = [&request.path_parameters, &request.query_string_parameters]
        .into_iter()
        .flatten()
        .find_map(non_blank);
    if from_params.is_some() {
        return from_params;
    }

    let body = request.body.as_deref().filter(|b| !b.is_empty())?;
    let payload: JsonValue = serde_json::from_str(body).ok()?;
    let name = match payload.get("name")? {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(name).filter(|name| !name.is_empty())
}

fn non_blank(container: &HashMap<String, String>) -> Option<String> {
    container
        .get("name")
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
