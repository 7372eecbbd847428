//! Interactive play: turns typed lines into requests on a [`GameClient`].
//!
//! The network bindings live in the infrastructure layer and implement
//! [`GameClient`]; this module only knows that a request can be sent.

use async_trait::async_trait;
use othello_core::ClientMessage;
use thiserror::Error;
use tracing::debug;

use super::commands::{parse_command, Command, HELP};

/// Error type for sending a request.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("connection closed by server")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

/// A connection to the server that requests can be sent on.
///
/// Replies and events come back on the binding's event channel, never as
/// the return value of `send`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameClient: Send + Sync {
    async fn send(&self, msg: &ClientMessage) -> Result<(), SendError>;
}

/// What the front end should do after a line was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A request went out; its reply arrives as an event.
    Sent,
    /// Show this text locally.
    Print(String),
    /// Leave the game.
    Quit,
}

/// Parses `line` and performs it on `client`.
///
/// Parse errors are not failures: they come back as text to show the user.
///
/// # Errors
///
/// Returns [`SendError`] if the request could not be sent.
pub async fn handle_line(client: &dyn GameClient, line: &str) -> Result<LineOutcome, SendError> {
    match parse_command(line) {
        Ok(Command::Send(msg)) => {
            client.send(&msg).await?;
            Ok(LineOutcome::Sent)
        }
        Ok(Command::Help) => Ok(LineOutcome::Print(HELP.to_string())),
        Ok(Command::Quit) => {
            if let Err(e) = client.send(&ClientMessage::Disconnect).await {
                debug!("disconnect not delivered: {e}");
            }
            Ok(LineOutcome::Quit)
        }
        Err(e) => Ok(LineOutcome::Print(e.to_string())),
    }
}
