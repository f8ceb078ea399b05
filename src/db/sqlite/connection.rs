//! SQLite connection pool utilities

use crate::error::Result;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

/// Busy wait applied to every pooled connection, in milliseconds
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Create a connection pool for the backend database
pub fn create_pool(path: &Path, size: u32) -> Result<Pool<SqliteConnectionManager>> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout={}; PRAGMA foreign_keys=ON;",
            BUSY_TIMEOUT_MS
        ))
    });

    Ok(Pool::builder().max_size(size).build(manager)?)
}
