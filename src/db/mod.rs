//! Backend database access
//!
//! Services talk to the backend only through [`QueryExecutor`], which maps
//! each result row to a column-name → value object. Typed records are then
//! read out of those rows with serde.

pub mod models;
pub mod sqlite;

use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// One result row keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Executes read-only backend queries
pub trait QueryExecutor: Send + Sync {
    /// Run `sql` with positional bind parameters and return every row
    fn execute_query(&self, sql: &str, params: &[String]) -> Result<Vec<Row>>;
}

/// Run a query on the blocking pool, bounded by `timeout`
pub async fn run_query(
    executor: Arc<dyn QueryExecutor>,
    sql: String,
    params: Vec<String>,
    timeout: Duration,
) -> Result<Vec<Row>> {
    let task = tokio::task::spawn_blocking(move || executor.execute_query(&sql, &params));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(AppError::Internal(format!("Query task failed: {}", join_err))),
        Err(_) => Err(AppError::Timeout(format!(
            "Backend query exceeded {}s",
            timeout.as_secs()
        ))),
    }
}

/// Deserialize rows into typed records
pub fn rows_into<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(serde_json::Value::Object(row)).map_err(AppError::from))
        .collect()
}
