//! SQLite backend

mod connection;
mod migrations;
pub mod queries;

use crate::config::DatabaseConfig;
use crate::db::{QueryExecutor, Row};
use crate::error::Result;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ValueRef;
use serde_json::Value;

/// Pooled read access to the backend database
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteBackend {
    /// Open the backend pool, creating the schema when configured to
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = connection::create_pool(&config.path, config.pool_size)?;
        let backend = Self { pool };

        if config.init_schema {
            backend.init_schema()?;
        }

        tracing::info!(
            "Backend database ready at {} (pool size {})",
            config.path.display(),
            config.pool_size
        );
        Ok(backend)
    }

    /// Create any missing backend tables
    pub fn init_schema(&self) -> Result<()> {
        let conn = self.pool.get()?;
        migrations::run_migrations(&conn)
    }

    /// Run a write statement; used for seeding
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

impl QueryExecutor for SqliteBackend {
    fn execute_query(&self, sql: &str, params: &[String]) -> Result<Vec<Row>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        let mut result = Vec::new();

        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), to_json(row.get_ref(idx)?));
            }
            result.push(record);
        }

        Ok(result)
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
