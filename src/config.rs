//! Configuration types.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Port the server listens on unless `MESSAGE_BOARD_PORT` says otherwise.
pub const DEFAULT_PORT: u16 = 5555;

/// Database file used unless `MESSAGE_BOARD_DB_PATH` says otherwise.
pub const DEFAULT_DB_PATH: &str = "./app.db";

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the listener on.
    pub host: IpAddr,
    /// Port to bind the listener on.
    pub port: u16,
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl ServerConfig {
    /// Build config from `MESSAGE_BOARD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// Unset variables fall back to defaults; a set but unparsable value is an error.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = match lookup("MESSAGE_BOARD_HOST") {
            Some(raw) => raw.trim().parse::<IpAddr>().map_err(|e| ConfigError::InvalidValue {
                key: "MESSAGE_BOARD_HOST".to_string(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => defaults.host,
        };

        let port = match lookup("MESSAGE_BOARD_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "MESSAGE_BOARD_PORT".to_string(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => defaults.port,
        };

        let db_path = lookup("MESSAGE_BOARD_DB_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        Ok(Self {
            host,
            port,
            db_path,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
