//! One-time startup: open the store, ensure the schema, seed an empty board.

use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::error::DatabaseError;
use crate::messages::model::Message;
use crate::store::{LibSqlBackend, MessageStore};

/// Body of the message inserted into an empty board.
pub const SEED_BODY: &str = "Hello from seed";

/// Author of the message inserted into an empty board.
pub const SEED_USERNAME: &str = "Seed";

/// Open the configured database file. Opening creates the schema.
pub async fn open_store(config: &ServerConfig) -> Result<Arc<dyn MessageStore>, DatabaseError> {
    let backend = LibSqlBackend::new_local(&config.db_path).await?;
    Ok(Arc::new(backend))
}

/// Insert the seed message if the board has no messages at all.
///
/// Returns the inserted message, or `None` when the board already had rows.
pub async fn seed_if_empty(store: &dyn MessageStore) -> Result<Option<Message>, DatabaseError> {
    if store.count().await? > 0 {
        return Ok(None);
    }

    let seed = store.insert(Some(SEED_BODY), Some(SEED_USERNAME)).await?;
    info!(message_id = seed.id, "Seeded empty message board");
    Ok(Some(seed))
}

/// Open the store and seed it. Run once before serving requests.
pub async fn init(config: &ServerConfig) -> Result<Arc<dyn MessageStore>, DatabaseError> {
    let store = open_store(config).await?;
    seed_if_empty(store.as_ref()).await?;
    Ok(store)
}
