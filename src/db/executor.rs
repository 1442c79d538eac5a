//! Query execution engine.
//!
//! Every call runs on its own connection:
//! - open a connection through the [`ConnectionFactory`] (fresh token each time)
//! - run the statement inside a transaction, with positional bind parameters
//! - optionally materialize the result rows
//! - commit
//! - close the connection, on the error path too
//!
//! Handlers see the executor through the [`Queryable`] trait.

use crate::db::connection::ConnectionFactory;
use crate::db::params::bind_all;
use crate::db::types::rows_to_maps;
use crate::error::DbResult;
use crate::models::{QueryParam, Row};
use async_trait::async_trait;
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Executor};
use std::time::Instant;
use tracing::{debug, warn};

/// The query interface exposed to request handlers.
#[async_trait]
pub trait Queryable: Send + Sync {
    /// Run a statement and return every result row.
    ///
    /// An empty vector means the statement matched no rows.
    async fn fetch_all(&self, sql: &str, params: Option<&[QueryParam]>) -> DbResult<Vec<Row>>;

    /// Run a statement for its side effect only.
    async fn execute(&self, sql: &str, params: Option<&[QueryParam]>) -> DbResult<()>;
}

/// Query executor that opens, uses and closes one connection per call.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    factory: ConnectionFactory,
}

impl QueryExecutor {
    pub fn new(factory: ConnectionFactory) -> Self {
        Self { factory }
    }

    /// Execute `sql` and, when `fetch` is set, return its rows.
    ///
    /// With `fetch == false` the result is always empty. Either the full row
    /// set or an error is returned, never both.
    pub async fn run(
        &self,
        sql: &str,
        params: Option<&[QueryParam]>,
        fetch: bool,
    ) -> DbResult<Vec<Row>> {
        let start = Instant::now();
        debug!(
            sql = %sql,
            params = ?params.map(|p| p.iter().map(QueryParam::type_name).collect::<Vec<_>>()),
            fetch,
            "Executing query"
        );

        let mut conn = self.factory.open().await?;

        // Dropping `conn` (panic, cancelled future) also releases the socket;
        // the explicit close below handles every normal exit.
        let outcome = run_in_transaction(&mut conn, sql, params, fetch).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close database connection cleanly");
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Ok(rows) => debug!(rows = rows.len(), elapsed_ms, "Query completed"),
            Err(e) => warn!(error = %e, elapsed_ms, "Query failed"),
        }
        outcome
    }
}

#[async_trait]
impl Queryable for QueryExecutor {
    async fn fetch_all(&self, sql: &str, params: Option<&[QueryParam]>) -> DbResult<Vec<Row>> {
        self.run(sql, params, true).await
    }

    async fn execute(&self, sql: &str, params: Option<&[QueryParam]>) -> DbResult<()> {
        self.run(sql, params, false).await.map(|_| ())
    }
}

async fn run_in_transaction(
    conn: &mut PgConnection,
    sql: &str,
    params: Option<&[QueryParam]>,
    fetch: bool,
) -> DbResult<Vec<Row>> {
    // An uncommitted transaction rolls back when dropped.
    let mut tx = conn.begin().await?;

    let rows = if fetch {
        let pg_rows = match params {
            Some(params) => bind_all(sql, params).fetch_all(&mut *tx).await?,
            None => (&mut *tx).fetch_all(sql).await?,
        };
        rows_to_maps(&pg_rows)?
    } else {
        let result = match params {
            Some(params) => bind_all(sql, params).execute(&mut *tx).await?,
            None => (&mut *tx).execute(sql).await?,
        };
        debug!(rows_affected = result.rows_affected(), "Statement executed");
        Vec::new()
    };

    tx.commit().await?;
    Ok(rows)
}
