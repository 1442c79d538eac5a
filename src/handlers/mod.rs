//! Request handlers.
//!
//! Each handler validates an API-Gateway-style [`ApiRequest`], calls the
//! database layer through [`Queryable`], and maps the outcome to an
//! [`ApiResponse`].

pub mod delete;
pub mod get;
pub mod post;

use crate::db::Queryable;
use crate::error::DbError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::error;

/// Incoming request envelope (proxy-integration shape).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn with_path_parameter(mut self, key: &str, value: &str) -> Self {
        self.path_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_query_parameter(mut self, key: &str, value: &str) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }
}

/// Outgoing response envelope.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    pub fn json(status_code: u16, body: &serde_json::Value) -> Self {
        Self::raw(status_code, body.to_string())
    }

    pub fn message(status_code: u16, message: impl fmt::Display) -> Self {
        Self::json(
            status_code,
            &serde_json::json!({ "message": message.to_string() }),
        )
    }

    pub fn empty(status_code: u16) -> Self {
        Self::raw(status_code, String::new())
    }

    fn raw(status_code: u16, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// Parse the body as JSON (test and tooling helper).
    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Map a database failure to a response. The failure is logged here.
pub fn error_response(err: &DbError) -> ApiResponse {
    error!(error = %err, "Database operation failed");
    let status = match err {
        DbError::Connectivity { .. } => 503,
        DbError::Configuration { .. } | DbError::Query { .. } | DbError::Internal { .. } => 500,
    };
    ApiResponse::message(status, err)
}

/// The three handler entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Get,
    Post,
    Delete,
}

impl FromStr for HandlerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" | "list" => Ok(Self::Get),
            "post" | "upsert" => Ok(Self::Post),
            "delete" => Ok(Self::Delete),
            other => Err(format!("Unknown handler '{}'", other)),
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Post => write!(f, "post"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Route a request to its handler.
pub async fn dispatch(kind: HandlerKind, db: &dyn Queryable, request: &ApiRequest) -> ApiResponse {
    match kind {
        HandlerKind::Get => get::handle(db, request).await,
        HandlerKind::Post => post::handle(db, request).await,
        HandlerKind::Delete => delete::handle(db, request).await,
    }
}
