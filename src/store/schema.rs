//! Schema setup for the libSQL backend.
//!
//! The schema is a single table created with `IF NOT EXISTS`, so applying it
//! on every startup is safe.

use libsql::Connection;

use crate::error::DatabaseError;

const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        body TEXT,
        username TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at);
"#;

/// Create the `messages` table and its ordering index.
pub async fn init_schema(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(SCHEMA_SQL)
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to create messages table: {e}")))?;

    tracing::debug!("Database schema ready");
    Ok(())
}
