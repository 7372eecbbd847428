//! Client configuration.
//!
//! Values come from an optional TOML file and are then overridden by
//! command-line flags in `main.rs`.  Every field has a default, so an empty
//! file (or no file) is valid.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading or validating client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot resolve server address {0}")]
    UnresolvedAddress(String),
    #[error("poll interval must be at least 1 ms")]
    ZeroPollInterval,
}

/// Which server binding to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Keep one connection open and receive every event as it happens.
    #[default]
    Push,
    /// Ask the server for its state every `poll_interval_ms`.
    Poll,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Push => f.write_str("push"),
            Mode::Poll => f.write_str("poll"),
        }
    }
}

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    /// Server port.  When unset, the default port of the chosen binding.
    pub port: Option<u16>,
    pub game_id: String,
    pub name: String,
    pub mode: Mode,
    pub poll_interval_ms: u64,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            game_id: "game1".to_string(),
            name: "Player".to_string(),
            mode: Mode::Push,
            poll_interval_ms: 100,
            log_level: "warn".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Port to connect to: the configured one, or 5000 (push) / 5001 (poll).
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(match self.mode {
            Mode::Push => 5000,
            Mode::Poll => 5001,
        })
    }

    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(Duration::from_millis(self.poll_interval_ms))
    }

    /// Resolves `host:port`.  Accepts names as well as IP literals.
    pub fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        let target = format!("{}:{}", self.host, self.effective_port());
        target
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or(ConfigError::UnresolvedAddress(target))
    }
}

/// Loads a [`ClientConfig`] from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ClientConfig::from_toml_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.mode, Mode::Push);
        assert_eq!(cfg.effective_port(), 5000);
        assert_eq!(cfg.poll_interval().unwrap(), Duration::from_millis(100));
    }

    #[test]
    fn test_poll_mode_uses_poll_port_by_default() {
        let cfg = ClientConfig::from_toml_str("mode = \"poll\"").unwrap();
        assert_eq!(cfg.effective_port(), 5001);
    }

    #[test]
    fn test_explicit_port_wins() {
        // Arrange
        let toml = r#"
            mode = "poll"
            port = 7000
            name = "alice"
        "#;

        // Act
        let cfg = ClientConfig::from_toml_str(toml).unwrap();

        // Assert
        assert_eq!(cfg.effective_port(), 7000);
        assert_eq!(cfg.name, "alice");
        assert_eq!(cfg.game_id, "game1");
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let cfg = ClientConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.poll_interval(), Err(ConfigError::ZeroPollInterval)));
    }

    #[test]
    fn test_server_addr_resolves_ip_literal() {
        let cfg = ClientConfig {
            port: Some(6000),
            ..Default::default()
        };
        assert_eq!(cfg.server_addr().unwrap(), "127.0.0.1:6000".parse().unwrap());
    }

    #[test]
    fn test_unknown_mode_is_a_parse_error() {
        assert!(matches!(
            ClientConfig::from_toml_str("mode = \"carrier-pigeon\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
