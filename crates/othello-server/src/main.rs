//! Othello match server: entry point.
//!
//! # Usage
//!
//! ```text
//! othello-server [OPTIONS]
//!
//! Options:
//!   --config <FILE>          TOML config file
//!   --bind <ADDR>            Address for all listeners [default: 0.0.0.0]
//!   --port <PORT>            Push binding port [default: 5000]
//!   --poll-port <PORT>       Poll binding port [default: 5001]
//!   --ws-port <PORT>         WebSocket binding port [default: 5002]
//!   --no-poll                Disable the poll binding
//!   --no-ws                  Disable the WebSocket binding
//!   --default-game-id <ID>   Game joined when a client names none [default: game1]
//!   --log-level <FILTER>     Log filter when RUST_LOG is unset [default: info]
//! ```
//!
//! Flags take precedence over the config file; each flag can also be set
//! through the environment variable shown in `--help`.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use othello_server::infrastructure::{load_config, run_server, ServerConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Authoritative two-player Othello server.
#[derive(Debug, Parser)]
#[command(name = "othello-server", about = "Two-player Othello match server", version)]
struct Cli {
    /// TOML configuration file.  Flags below override its values.
    #[arg(long, env = "OTHELLO_CONFIG")]
    config: Option<PathBuf>,

    /// IP address all listeners bind to.
    #[arg(long, env = "OTHELLO_BIND")]
    bind: Option<String>,

    /// TCP port of the push binding.
    #[arg(long, env = "OTHELLO_PORT")]
    port: Option<u16>,

    /// TCP port of the poll binding.
    #[arg(long, env = "OTHELLO_POLL_PORT")]
    poll_port: Option<u16>,

    /// TCP port of the WebSocket binding.
    #[arg(long, env = "OTHELLO_WS_PORT")]
    ws_port: Option<u16>,

    /// Do not start the poll binding.
    #[arg(long)]
    no_poll: bool,

    /// Do not start the WebSocket binding.
    #[arg(long)]
    no_ws: bool,

    /// Game joined by clients that do not name one.
    #[arg(long, env = "OTHELLO_DEFAULT_GAME_ID")]
    default_game_id: Option<String>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "OTHELLO_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Builds the effective [`ServerConfig`]: file (or defaults), then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if
    /// the resulting listen address is invalid.
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(port) = self.poll_port {
            config.poll_port = port;
        }
        if let Some(port) = self.ws_port {
            config.ws_port = port;
        }
        if self.no_poll {
            config.enable_poll = false;
        }
        if self.no_ws {
            config.enable_ws = false;
        }
        if let Some(game_id) = self.default_game_id {
            config.default_game_id = game_id;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        config
            .push_addr()
            .context("invalid --bind / --port combination")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Othello server starting: bind={}, push={}, poll={}, ws={}",
        config.bind_address,
        config.port,
        if config.enable_poll { config.poll_port.to_string() } else { "off".into() },
        if config.enable_ws { config.ws_port.to_string() } else { "off".into() },
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    run_server(config, running).await?;

    info!("Othello server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_produce_default_config() {
        // Arrange: no arguments
        let cli = Cli::parse_from(["othello-server"]);

        // Act
        let config = cli.into_config().unwrap();

        // Assert
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::parse_from(["othello-server", "--port", "6000"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.poll_port, 5001);
    }

    #[test]
    fn test_cli_disables_optional_bindings() {
        let cli = Cli::parse_from(["othello-server", "--no-poll", "--no-ws"]);
        let config = cli.into_config().unwrap();
        assert!(!config.enable_poll);
        assert!(!config.enable_ws);
    }

    #[test]
    fn test_cli_default_game_id_override() {
        let cli = Cli::parse_from(["othello-server", "--default-game-id", "lobby"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.default_game_id, "lobby");
    }

    #[test]
    fn test_cli_invalid_bind_is_rejected() {
        let cli = Cli::parse_from(["othello-server", "--bind", "not.an.ip"]);
        assert!(cli.into_config().is_err());
    }

    #[test]
    fn test_cli_missing_config_file_is_rejected() {
        let cli = Cli::parse_from(["othello-server", "--config", "/no/such/othello.toml"]);
        assert!(cli.into_config().is_err());
    }
}
