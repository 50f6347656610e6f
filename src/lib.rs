//! Message Board — a single-resource CRUD backend over HTTP.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod messages;
pub mod store;
