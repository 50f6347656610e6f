//! `MessageStore` trait — single async interface for message persistence.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::messages::model::Message;

/// Backend-agnostic storage for board messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Create the `messages` table and its index if they don't exist yet.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    /// Insert a new message. Both timestamps are stamped with the same instant.
    async fn insert(
        &self,
        body: Option<&str>,
        username: Option<&str>,
    ) -> Result<Message, DatabaseError>;

    /// Get a message by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, DatabaseError>;

    /// All messages, oldest first (`created_at`, then `id`).
    async fn list_all(&self) -> Result<Vec<Message>, DatabaseError>;

    /// Replace a message's body and refresh `updated_at`.
    ///
    /// With `new_body == None` the row is returned untouched.
    /// Fails with `DatabaseError::NotFound` if the message doesn't exist.
    async fn update(&self, id: i64, new_body: Option<&str>) -> Result<Message, DatabaseError>;

    /// Permanently remove a message.
    ///
    /// Fails with `DatabaseError::NotFound` if the message doesn't exist.
    async fn delete(&self, id: i64) -> Result<(), DatabaseError>;

    /// Number of stored messages.
    async fn count(&self) -> Result<u64, DatabaseError>;
}
