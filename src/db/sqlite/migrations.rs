//! Backend schema migrations
//!
//! Only applied when `DB_INIT_SCHEMA` is set. Against a production backend
//! the tables already exist and are never altered from here.

use crate::error::Result;
use rusqlite::Connection;

/// Create any missing backend tables
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_member_form", CREATE_MEMBER_FORM_TABLE)?;
    run_migration(conn, "002_members", CREATE_MEMBER_TABLES)?;
    run_migration(conn, "003_products", CREATE_PRODUCT_TABLE)?;
    run_migration(conn, "004_terms", CREATE_TERM_TABLE)?;
    run_migration(conn, "005_orders", CREATE_ORDER_TABLES)?;
    run_migration(conn, "006_payments", CREATE_PAYMENT_TABLE)?;

    tracing::info!("Backend schema migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO schema_migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

/// Lead form submissions carrying UTM attribution
const CREATE_MEMBER_FORM_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS MemberForm (
    Id INTEGER PRIMARY KEY AUTOINCREMENT,
    MemberId INTEGER NOT NULL,
    BrandId INTEGER NOT NULL DEFAULT 1,
    UtmSource TEXT,
    UtmMedium TEXT,
    UtmTerm TEXT,
    UtmContent TEXT,
    CreateDate TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_member_form_member ON MemberForm(MemberId, CreateDate);
CREATE INDEX IF NOT EXISTS idx_member_form_source ON MemberForm(UtmSource, CreateDate);
"#;

const CREATE_MEMBER_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS Member (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    CreateDate TEXT NOT NULL DEFAULT (datetime('now'))
);

-- EmployeeTypeId 4 is the assigned sales representative
CREATE TABLE IF NOT EXISTS EmployeeMember (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    MemberId INTEGER NOT NULL,
    EmployeeId INTEGER,
    EmployeeTypeId INTEGER NOT NULL,
    Status INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_employee_member ON EmployeeMember(MemberId);
"#;

const CREATE_PRODUCT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Product (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    Title TEXT NOT NULL
);
"#;

/// Enrolments; SalesType 1 is a new sale
const CREATE_TERM_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Term (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    MemberId INTEGER NOT NULL,
    ProductId INTEGER,
    StudentName TEXT,
    StudentNo TEXT,
    BeginDate TEXT,
    Status INTEGER,
    LessonDuration INTEGER,
    SalesType INTEGER NOT NULL,
    CreateDate TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_term_member ON Term(MemberId);
"#;

const CREATE_ORDER_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS "Order" (
    Id INTEGER PRIMARY KEY AUTOINCREMENT,
    Price REAL,
    TotalPrice REAL NOT NULL,
    CreateDate TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS OrderTermDetail (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    OrderId INTEGER NOT NULL,
    TermId INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_order_term_detail_term ON OrderTermDetail(TermId);
CREATE INDEX IF NOT EXISTS idx_order_term_detail_order ON OrderTermDetail(OrderId);
"#;

/// Status 1 is a completed payment
const CREATE_PAYMENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Payment (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    OrderId INTEGER NOT NULL,
    Status INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_payment_order ON Payment(OrderId);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 6);

        conn.execute(
            "INSERT INTO MemberForm (MemberId, UtmSource, CreateDate) VALUES (1, 'google', '2024-03-01 10:00:00')",
            [],
        )
        .unwrap();
        conn.execute(r#"INSERT INTO "Order" (TotalPrice, CreateDate) VALUES (110.0, '2024-03-02')"#, [])
            .unwrap();
    }
}
