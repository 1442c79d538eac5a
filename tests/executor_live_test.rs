//! Integration tests for the query executor against a live PostgreSQL server.
//!
//! These tests require a TLS-enabled server whose certificate matches the
//! host name. Set the following environment variables to run them:
//!
//! ```text
//! TEST_PG_HOST=db.local TEST_PG_USER=postgres TEST_PG_PASSWORD=secret \
//! TEST_PG_DATABASE=zoo TEST_PG_ROOT_CERT=/path/to/ca.pem cargo test
//! ```
//!
//! `TEST_PG_PORT` is optional and defaults to 5432. The server is reached with
//! a static password in place of an IAM token.

use animals_api::config::{ENV_DB_HOST, ENV_DB_NAME, ENV_DB_PORT, ENV_DB_USERNAME, EnvSource};
use animals_api::db::{ConnectionFactory, QueryExecutor, Queryable, StaticToken, TlsContext};
use animals_api::handlers::get::LIST_SQL;
use animals_api::handlers::post::UPSERT_SQL;
use animals_api::handlers::delete::DELETE_SQL;
use animals_api::models::{QueryParam, SqlValue};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS animals (\
     name TEXT PRIMARY KEY, \
     weight NUMERIC(10, 2) NOT NULL, \
     height NUMERIC(10, 2) NOT NULL)";

/// Build an executor from `TEST_PG_*`, or `None` when the server is not configured.
async fn live_executor() -> Option<QueryExecutor> {
    let host = match std::env::var("TEST_PG_HOST") {
        Ok(host) => host,
        Err(_) => {
            eprintln!("Skipping test: TEST_PG_HOST not set");
            return None;
        }
    };

    let mut vars = HashMap::new();
    vars.insert(ENV_DB_HOST.to_string(), host);
    vars.insert(
        ENV_DB_PORT.to_string(),
        std::env::var("TEST_PG_PORT").unwrap_or_else(|_| "5432".to_string()),
    );
    vars.insert(
        ENV_DB_USERNAME.to_string(),
        std::env::var("TEST_PG_USER").unwrap_or_else(|_| "postgres".to_string()),
    );
    vars.insert(
        ENV_DB_NAME.to_string(),
        std::env::var("TEST_PG_DATABASE").unwrap_or_else(|_| "postgres".to_string()),
    );
    let env: Arc<dyn EnvSource> = Arc::new(vars);

    let password = std::env::var("TEST_PG_PASSWORD").unwrap_or_default();
    let tls = match std::env::var("TEST_PG_ROOT_CERT") {
        Ok(path) => TlsContext::with_root_cert(path),
        Err(_) => TlsContext::new(),
    };

    let factory = ConnectionFactory::new(env, Arc::new(StaticToken::new(password)), Arc::new(tls));
    let executor = QueryExecutor::new(factory);
    executor
        .execute(CREATE_TABLE_SQL, None)
        .await
        .expect("Failed to create animals table");
    Some(executor)
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn delete(executor: &QueryExecutor, name: &str) {
    let params = [QueryParam::from(name)];
    executor
        .fetch_all(DELETE_SQL, Some(&params[..]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upsert_then_fetch_returns_single_row() {
    let Some(executor) = live_executor().await else {
        return;
    };
    let name = "live-test-fox";
    delete(&executor, name).await;

    for (weight, height) in [("1.0", "0.1"), ("4.2", "0.6")] {
        let params = [
            QueryParam::from(name),
            QueryParam::Decimal(decimal(weight)),
            QueryParam::Decimal(decimal(height)),
        ];
        executor
            .execute(UPSERT_SQL, Some(&params[..]))
            .await
            .unwrap();
    }

    let params = [QueryParam::from(name)];
    let rows = executor
        .fetch_all(
            "SELECT name, weight, height FROM animals WHERE name = $1",
            Some(&params[..]),
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row["name"].as_str(), Some(name));
    assert_eq!(row["weight"].as_decimal(), Some(decimal("4.2")));
    assert_eq!(row["height"].as_decimal(), Some(decimal("0.6")));

    delete(&executor, name).await;
}

#[tokio::test]
async fn test_delete_missing_returns_no_rows() {
    let Some(executor) = live_executor().await else {
        return;
    };
    let params = [QueryParam::from("live-test-ghost")];
    let rows = executor
        .fetch_all(DELETE_SQL, Some(&params[..]))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_metacharacters_are_bound_not_interpreted() {
    let Some(executor) = live_executor().await else {
        return;
    };
    let name = "live'; DROP TABLE animals; --";
    let params = [
        QueryParam::from(name),
        QueryParam::Decimal(Decimal::ONE),
        QueryParam::Decimal(Decimal::ONE),
    ];
    executor
        .execute(UPSERT_SQL, Some(&params[..]))
        .await
        .unwrap();

    let deleted = executor
        .fetch_all(DELETE_SQL, Some(&[QueryParam::from(name)][..]))
        .await
        .unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0]["name"].as_str(), Some(name));

    // Table still exists.
    executor.fetch_all(LIST_SQL, None).await.unwrap();
}

#[tokio::test]
async fn test_run_without_fetch_returns_empty() {
    let Some(executor) = live_executor().await else {
        return;
    };
    let rows = executor.run("SELECT 1 AS one", None, false).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_rows_keep_column_order() {
    let Some(executor) = live_executor().await else {
        return;
    };
    let rows = executor
        .fetch_all("SELECT 3 AS c, 'x' AS a, NULL::text AS b", None)
        .await
        .unwrap();
    let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(columns, ["c", "a", "b"]);
    assert_eq!(rows[0]["c"], SqlValue::Int(3));
    assert!(rows[0]["b"].is_null());
}

#[tokio::test]
async fn test_query_error_is_reported_after_close() {
    let Some(executor) = live_executor().await else {
        return;
    };
    let err = executor
        .fetch_all("SELECT * FROM no_such_table", None)
        .await
        .unwrap_err();
    assert_eq!(err.sql_state(), Some("42P01"));

    // The executor stays usable after a failed statement.
    executor.fetch_all("SELECT 1 AS one", None).await.unwrap();
}

#[tokio::test]
async fn test_rows_keep_order_and_width() {
    let Some(executor) = live_executor().await else {
        return;
    };
    let rows = executor
        .fetch_all(
            "SELECT * FROM (VALUES (3, 'c'), (1, 'a'), (2, 'b')) AS t(n, s) ORDER BY n DESC",
            None,
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.len(), 2);
    }
    let order: Vec<(SqlValue, Option<&str>)> = rows
        .iter()
        .map(|row| (row["n"].clone(), row["s"].as_str()))
        .collect();
    assert_eq!(
        order,
        [
            (SqlValue::Int(3), Some("c")),
            (SqlValue::Int(2), Some("b")),
            (SqlValue::Int(1), Some("a")),
        ]
    );
}

const UNCOMMON_TYPES_SQL: &str = "SELECT interval '1 day' AS span, \
     ARRAY[1, 2] AS ints, \
     ARRAY['x', NULL]::text[] AS labels, \
     1::oid AS object_id, \
     '12:30:00+02'::timetz AS local_time, \
     1e30::numeric AS huge, \
     'NaN'::numeric AS not_a_number, \
     '4.2'::numeric AS regular";

#[tokio::test]
async fn test_uncommon_types_materialize_in_text_format() {
    let Some(executor) = live_executor().await else {
        return;
    };
    // No parameters: the server answers in text format.
    let rows = executor.fetch_all(UNCOMMON_TYPES_SQL, None).await.unwrap();
    let row = &rows[0];

    assert_eq!(row["span"].as_str(), Some("1 day"));
    assert_eq!(row["ints"].as_str(), Some("{1,2}"));
    assert_eq!(row["labels"].as_str(), Some("{x,NULL}"));
    assert_eq!(row["object_id"], SqlValue::Int(1));
    assert!(row["local_time"].as_str().unwrap().starts_with("12:30:00"));
    assert_eq!(
        row["huge"],
        SqlValue::Numeric(format!("1{}", "0".repeat(30)))
    );
    assert_eq!(row["not_a_number"], SqlValue::Numeric("NaN".into()));
    assert_eq!(row["regular"].as_decimal(), Some(decimal("4.2")));
}

#[tokio::test]
async fn test_uncommon_types_materialize_in_binary_format() {
    let Some(executor) = live_executor().await else {
        return;
    };
    // An empty parameter list still goes through the prepared path.
    let no_params: [QueryParam; 0] = [];
    let rows = executor
        .fetch_all(UNCOMMON_TYPES_SQL, Some(&no_params[..]))
        .await
        .unwrap();
    let row = &rows[0];

    assert_eq!(row["span"].as_str(), Some("1 day"));
    assert_eq!(row["ints"], SqlValue::Json(serde_json::json!([1, 2])));
    assert_eq!(row["labels"], SqlValue::Json(serde_json::json!(["x", null])));
    assert_eq!(row["object_id"], SqlValue::Int(1));
    assert_eq!(row["local_time"].as_str(), Some("12:30:00+02:00"));
    assert_eq!(
        row["huge"],
        SqlValue::Numeric(format!("1{}", "0".repeat(30)))
    );
    assert_eq!(row["not_a_number"], SqlValue::Numeric("NaN".into()));
    assert_eq!(row["regular"].as_decimal(), Some(decimal("4.2")));
}
