//! TOML configuration for the server.
//!
//! Every field has a serde default, so an empty file (or no file at all) is
//! a valid configuration.  Command-line flags override whatever the file
//! says; see `main.rs`.
//!
//! ```toml
//! bind_address = "0.0.0.0"
//! port = 5000          # push binding, newline-delimited JSON over TCP
//! poll_port = 5001     # poll binding, request/response over TCP
//! ws_port = 5002       # push binding over WebSocket
//! enable_poll = true
//! enable_ws = true
//! default_game_id = "game1"
//! default_player_name = "Player"
//! log_level = "info"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use othello_core::protocol::{DEFAULT_GAME_ID, DEFAULT_PLAYER_NAME};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` and a port did not form a socket address.
    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// IP address all listeners bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port of the push binding.
    #[serde(default = "default_port")]
    pub port: u16,
    /// TCP port of the poll binding.
    #[serde(default = "default_poll_port")]
    pub poll_port: u16,
    /// TCP port of the WebSocket push binding.
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    #[serde(default = "default_true")]
    pub enable_poll: bool,
    #[serde(default = "default_true")]
    pub enable_ws: bool,
    /// Game joined by a `connect` that names none.
    #[serde(default = "default_game_id")]
    pub default_game_id: String,
    /// Display name given to a `connect` that names none.
    #[serde(default = "default_player_name")]
    pub default_player_name: String,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_poll_port() -> u16 {
    5001
}
fn default_ws_port() -> u16 {
    5002
}
fn default_true() -> bool {
    true
}
fn default_game_id() -> String {
    DEFAULT_GAME_ID.to_string()
}
fn default_player_name() -> String {
    DEFAULT_PLAYER_NAME.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            poll_port: default_poll_port(),
            ws_port: default_ws_port(),
            enable_poll: default_true(),
            enable_ws: default_true(),
            default_game_id: default_game_id(),
            default_player_name: default_player_name(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Socket address for `port` on the configured bind address.
    pub fn socket_addr(&self, port: u16) -> Result<SocketAddr, ConfigError> {
        let text = format!("{}:{}", self.bind_address, port);
        text.parse().map_err(|_| ConfigError::InvalidAddress(text))
    }

    pub fn push_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.socket_addr(self.port)
    }

    /// `None` when the poll binding is disabled.
    pub fn poll_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.enable_poll
            .then(|| self.socket_addr(self.poll_port))
            .transpose()
    }

    /// `None` when the WebSocket binding is disabled.
    pub fn ws_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.enable_ws
            .then(|| self.socket_addr(self.ws_port))
            .transpose()
    }
}

/// Loads a configuration file.
///
/// Unlike a default config location, an explicitly named file must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ServerConfig::from_toml_str(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_expected_ports() {
        let cfg = ServerConfig::default();

        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.poll_port, 5001);
        assert_eq!(cfg.ws_port, 5002);
    }

    #[test]
    fn test_default_config_has_expected_names() {
        let cfg = ServerConfig::default();

        assert_eq!(cfg.default_game_id, "game1");
        assert_eq!(cfg.default_player_name, "Player");
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let cfg = ServerConfig::from_toml_str("").unwrap();

        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_named_fields() {
        // Arrange
        let text = "port = 7000\nenable_ws = false\n";

        // Act
        let cfg = ServerConfig::from_toml_str(text).unwrap();

        // Assert
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.poll_port, 5001);
        assert_eq!(cfg.ws_addr().unwrap(), None);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = ServerConfig::from_toml_str("port = \"not a number\"");

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_bind_address_is_reported() {
        let cfg = ServerConfig {
            bind_address: "not.an.ip".to_string(),
            ..ServerConfig::default()
        };

        assert!(matches!(
            cfg.push_addr(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_addresses_use_bind_address() {
        let cfg = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            ..ServerConfig::default()
        };

        assert_eq!(cfg.push_addr().unwrap().to_string(), "127.0.0.1:5000");
        assert_eq!(
            cfg.poll_addr().unwrap().map(|a| a.to_string()),
            Some("127.0.0.1:5001".to_string())
        );
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let result = load_config(Path::new("/definitely/not/here/othello.toml"));

        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
