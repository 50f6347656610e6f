//! Persistence layer — libSQL-backed storage for board messages.

pub mod libsql_backend;
pub mod schema;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::MessageStore;
