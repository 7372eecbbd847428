//! Othello text client: entry point.
//!
//! ```text
//! othello-client [OPTIONS]
//!
//! Options:
//!   --config <FILE>            TOML config file
//!   --host <HOST>              Server host [default: 127.0.0.1]
//!   --port <PORT>              Server port [default: 5000 push, 5001 poll]
//!   --game-id <ID>             Game to join [default: game1]
//!   --name <NAME>              Display name [default: Player]
//!   --mode <push|poll>         Server binding [default: push]
//!   --poll-interval-ms <MS>    Poll period in poll mode [default: 100]
//! ```
//!
//! Reads commands from stdin (type `help`) and prints server events to
//! stdout.  Logs go to stderr.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use othello_client::application::{handle_line, render_message, GameClient, LineOutcome};
use othello_client::infrastructure::{load_config, ClientConfig, Mode, NetworkEvent, PollClient, PushClient};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "othello-client", about = "Text client for the Othello match server", version)]
struct Cli {
    /// TOML configuration file.  Flags below override its values.
    #[arg(long, env = "OTHELLO_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "OTHELLO_HOST")]
    host: Option<String>,

    #[arg(long, env = "OTHELLO_PORT")]
    port: Option<u16>,

    #[arg(long, env = "OTHELLO_GAME_ID")]
    game_id: Option<String>,

    #[arg(long, env = "OTHELLO_NAME")]
    name: Option<String>,

    #[arg(long, value_enum)]
    mode: Option<Mode>,

    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ClientConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if self.port.is_some() {
            config.port = self.port;
        }
        if let Some(game_id) = self.game_id {
            config.game_id = game_id;
        }
        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        config.poll_interval()?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let addr = config.server_addr()?;
    info!("connecting to {addr} ({} mode)", config.mode);

    let running = Arc::new(AtomicBool::new(true));
    let (client, mut events): (Arc<dyn GameClient>, _) = match config.mode {
        Mode::Push => {
            let (client, events) = PushClient::connect(addr, &config.game_id, &config.name).await?;
            (Arc::new(client) as Arc<dyn GameClient>, events)
        }
        Mode::Poll => {
            let (client, events) = PollClient::connect(addr, &config.game_id, &config.name).await?;
            client.spawn_poll_loop(config.poll_interval()?, Arc::clone(&running));
            (client as Arc<dyn GameClient>, events)
        }
    };

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(NetworkEvent::Message(msg)) => println!("{}", render_message(&msg)),
                Some(NetworkEvent::Disconnected) | None => {
                    println!("disconnected from server");
                    break;
                }
            },
            line = stdin.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match handle_line(client.as_ref(), &line).await {
                    Ok(LineOutcome::Sent) => {}
                    Ok(LineOutcome::Print(text)) => println!("{text}"),
                    Ok(LineOutcome::Quit) => break,
                    Err(e) => {
                        warn!("request failed: {e}");
                        println!("disconnected from server");
                        break;
                    }
                }
            }
        }
    }

    running.store(false, Ordering::Relaxed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = Cli::parse_from(["othello-client"]).into_config().unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_cli_poll_mode_and_interval() {
        // Arrange
        let cli = Cli::parse_from([
            "othello-client",
            "--mode",
            "poll",
            "--poll-interval-ms",
            "250",
            "--name",
            "alice",
        ]);

        // Act
        let config = cli.into_config().unwrap();

        // Assert
        assert_eq!(config.mode, Mode::Poll);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.name, "alice");
        assert_eq!(config.effective_port(), 5001);
    }

    #[test]
    fn test_cli_zero_interval_rejected() {
        let cli = Cli::parse_from(["othello-client", "--poll-interval-ms", "0"]);
        assert!(cli.into_config().is_err());
    }
}
