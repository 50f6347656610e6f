//! libSQL backend — async `MessageStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::messages::model::{Message, format_timestamp};
use crate::store::schema;
use crate::store::traits::MessageStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and create the schema.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run a query expected to yield at most one message row.
    async fn query_one(
        &self,
        op: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<Message>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("{op}: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let msg = row_to_message(&row)
                    .map_err(|e| DatabaseError::Query(format!("{op} row parse: {e}")))?;
                Ok(Some(msg))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("{op}: {e}"))),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    // SQLite datetime() output with fractional seconds
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    // SQLite datetime() output without fractional seconds
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql Row to a Message.
///
/// Column order matches MESSAGE_COLUMNS.
fn row_to_message(row: &libsql::Row) -> Result<Message, libsql::Error> {
    let created_str: String = row.get(3)?;
    let updated_str: String = row.get(4)?;

    Ok(Message {
        id: row.get(0)?,
        body: opt_text_column(row, 1)?,
        username: opt_text_column(row, 2)?,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Read a nullable TEXT column. Any other storage class is an error.
fn opt_text_column(row: &libsql::Row, idx: i32) -> Result<Option<String>, libsql::Error> {
    match row.get_value(idx)? {
        libsql::Value::Null => Ok(None),
        libsql::Value::Text(s) => Ok(Some(s)),
        _ => Err(libsql::Error::InvalidColumnType),
    }
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

// ── Trait implementation ────────────────────────────────────────────

const MESSAGE_COLUMNS: &str = "id, body, username, created_at, updated_at";

#[async_trait]
impl MessageStore for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        schema::init_schema(self.conn()).await
    }

    async fn insert(
        &self,
        body: Option<&str>,
        username: Option<&str>,
    ) -> Result<Message, DatabaseError> {
        let now = format_timestamp(&Utc::now());
        let msg = self
            .query_one(
                "insert",
                &format!(
                    "INSERT INTO messages (body, username, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?3) RETURNING {MESSAGE_COLUMNS}"
                ),
                params![opt_text(body), opt_text(username), now],
            )
            .await?
            .ok_or_else(|| DatabaseError::Query("insert: no row returned".to_string()))?;

        debug!(message_id = msg.id, "Message inserted");
        Ok(msg)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, DatabaseError> {
        self.query_one(
            "find_by_id",
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
            params![id],
        )
        .await
    }

    async fn list_all(&self) -> Result<Vec<Message>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY created_at ASC, id ASC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_all: {e}")))?;

        let mut messages = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_all: {e}")))?
        {
            let msg = row_to_message(&row)
                .map_err(|e| DatabaseError::Query(format!("list_all row parse: {e}")))?;
            messages.push(msg);
        }
        Ok(messages)
    }

    async fn update(&self, id: i64, new_body: Option<&str>) -> Result<Message, DatabaseError> {
        let updated = match new_body {
            Some(body) => {
                let now = format_timestamp(&Utc::now());
                self.query_one(
                    "update",
                    &format!(
                        "UPDATE messages SET body = ?1, updated_at = ?2 WHERE id = ?3 \
                         RETURNING {MESSAGE_COLUMNS}"
                    ),
                    params![body, now, id],
                )
                .await?
            }
            // Nothing changed; the row is returned as-is
            None => self.find_by_id(id).await?,
        };

        let msg = updated.ok_or_else(|| DatabaseError::message_not_found(id))?;
        debug!(message_id = id, body_changed = new_body.is_some(), "Message updated");
        Ok(msg)
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM messages WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete: {e}")))?;

        if deleted == 0 {
            return Err(DatabaseError::message_not_found(id));
        }
        debug!(message_id = id, "Message deleted");
        Ok(())
    }

    async fn count(&self) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM messages", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("count: {e}")))?;

        match row {
            Some(row) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("count row parse: {e}")))?;
                Ok(count.max(0) as u64)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn open_in_memory_starts_empty() {
        let db = test_db().await;
        assert_eq!(db.count().await.unwrap(), 0);
        assert!(db.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_and_find_by_id() {
        let db = test_db().await;
        let msg = db.insert(Some("hi"), Some("bob")).await.unwrap();

        assert_eq!(msg.body.as_deref(), Some("hi"));
        assert_eq!(msg.username.as_deref(), Some("bob"));
        assert_eq!(msg.created_at, msg.updated_at);

        let loaded = db.find_by_id(msg.id).await.unwrap().unwrap();
        assert_eq!(loaded, msg);
    }

    #[tokio::test]
    async fn insert_stores_values_verbatim() {
        let db = test_db().await;
        let msg = db.insert(Some("  padded  "), Some("")).await.unwrap();
        let loaded = db.find_by_id(msg.id).await.unwrap().unwrap();
        assert_eq!(loaded.body.as_deref(), Some("  padded  "));
        assert_eq!(loaded.username.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn insert_with_missing_fields_stores_null() {
        let db = test_db().await;
        let msg = db.insert(None, None).await.unwrap();
        assert!(msg.body.is_none());
        assert!(msg.username.is_none());

        let loaded = db.find_by_id(msg.id).await.unwrap().unwrap();
        assert!(loaded.body.is_none());
        assert!(loaded.username.is_none());
    }

    #[tokio::test]
    async fn ids_are_unique_and_never_reused() {
        let db = test_db().await;
        let a = db.insert(Some("a"), Some("u")).await.unwrap();
        let b = db.insert(Some("b"), Some("u")).await.unwrap();
        assert_ne!(a.id, b.id);

        db.delete(b.id).await.unwrap();
        let c = db.insert(Some("c"), Some("u")).await.unwrap();
        assert!(c.id > b.id);
    }

    #[tokio::test]
    async fn find_by_id_not_found() {
        let db = test_db().await;
        assert!(db.find_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_all_orders_by_created_at() {
        let db = test_db().await;
        for body in ["first", "second", "third"] {
            db.insert(Some(body), Some("u")).await.unwrap();
        }

        let all = db.list_all().await.unwrap();
        let bodies: Vec<_> = all.iter().map(|m| m.body.as_deref().unwrap()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
        assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn list_all_breaks_timestamp_ties_by_id() {
        let db = test_db().await;
        let ts = "2024-01-01T00:00:00.000000Z";
        for body in ["x", "y"] {
            db.conn()
                .execute(
                    "INSERT INTO messages (body, username, created_at, updated_at) VALUES (?1, 'u', ?2, ?2)",
                    params![body, ts],
                )
                .await
                .unwrap();
        }
        // An older row inserted last still sorts first
        db.conn()
            .execute(
                "INSERT INTO messages (body, username, created_at, updated_at) VALUES ('old', 'u', ?1, ?1)",
                params!["2023-06-01T00:00:00.000000Z"],
            )
            .await
            .unwrap();

        let all = db.list_all().await.unwrap();
        let bodies: Vec<_> = all.iter().map(|m| m.body.as_deref().unwrap()).collect();
        assert_eq!(bodies, vec!["old", "x", "y"]);
    }

    #[tokio::test]
    async fn update_changes_body_only() {
        let db = test_db().await;
        let original = db.insert(Some("old"), Some("ana")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let updated = db.update(original.id, Some("new")).await.unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.body.as_deref(), Some("new"));
        assert_eq!(updated.username, original.username);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);

        let loaded = db.find_by_id(original.id).await.unwrap().unwrap();
        assert_eq!(loaded, updated);
    }

    #[tokio::test]
    async fn update_to_empty_string_is_allowed() {
        let db = test_db().await;
        let msg = db.insert(Some("text"), Some("ana")).await.unwrap();
        let updated = db.update(msg.id, Some("")).await.unwrap();
        assert_eq!(updated.body.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn update_without_body_leaves_row_untouched() {
        let db = test_db().await;
        let original = db.insert(Some("keep"), Some("ana")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let same = db.update(original.id, None).await.unwrap();
        assert_eq!(same, original);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let db = test_db().await;
        assert!(db.update(42, Some("x")).await.unwrap_err().is_not_found());
        assert!(db.update(42, None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let db = test_db().await;
        let msg = db.insert(Some("bye"), Some("ana")).await.unwrap();
        db.delete(msg.id).await.unwrap();

        assert!(db.find_by_id(msg.id).await.unwrap().is_none());
        assert!(db.delete(msg.id).await.unwrap_err().is_not_found());
        assert!(db.update(msg.id, Some("x")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn count_tracks_inserts_and_deletes() {
        let db = test_db().await;
        let a = db.insert(Some("a"), None).await.unwrap();
        db.insert(Some("b"), None).await.unwrap();
        assert_eq!(db.count().await.unwrap(), 2);

        db.delete(a.id).await.unwrap();
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn file_backed_db_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("board.db");

        let id = {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.insert(Some("durable"), Some("ana")).await.unwrap().id
        };
        assert!(path.exists());

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let loaded = db.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded.body.as_deref(), Some("durable"));
    }

    #[tokio::test]
    async fn non_text_body_is_an_error_not_null() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO messages (body, username, created_at, updated_at) VALUES (X'DEADBEEF', 'u', ?1, ?1)",
                params!["2024-01-01T00:00:00.000000Z"],
            )
            .await
            .unwrap();

        let err = db.find_by_id(1).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Query(_)));
        assert!(db.list_all().await.is_err());
    }

    #[test]
    fn datetime_format_is_fixed_width() {
        let early = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2024-01-01T00:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);
        let (a, b) = (format_timestamp(&early), format_timestamp(&late));
        assert_eq!(a, "2024-01-01T00:00:00.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_datetime(&b), late);
    }

    #[test]
    fn parse_datetime_accepts_sqlite_format() {
        let dt = parse_datetime("2024-03-04 05:06:07");
        assert_eq!(format_timestamp(&dt), "2024-03-04T05:06:07.000000Z");
        assert_eq!(parse_datetime("garbage"), DateTime::<Utc>::MIN_UTC);
    }
}
