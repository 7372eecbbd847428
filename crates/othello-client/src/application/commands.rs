//! Text command parser for the interactive client.
//!
//! | input               | request                          |
//! |---------------------|----------------------------------|
//! | `move <row> <col>`  | `move` (also `m`)                |
//! | `chat <text>`       | `chat` (also `say`)              |
//! | `surrender`         | `surrender_request`              |
//! | `accept` / `reject` | `surrender_response`             |
//! | `reset`             | `reset`                          |
//! | `state`             | `get_state`                      |
//! | `quit`              | `disconnect`, then exit          |
//! | `help`              | local only                       |
//!
//! Rows and columns are 0-based.  Parsing never touches the network.

use othello_core::{ClientMessage, BOARD_SIZE};
use thiserror::Error;

/// Errors produced while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (type `help`)")]
    Unknown(String),
    #[error("usage: move <row> <col>")]
    MoveUsage,
    #[error("coordinate `{0}` is not between 0 and 7")]
    BadCoordinate(String),
    #[error("usage: chat <message>")]
    EmptyChat,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send this request to the server.
    Send(ClientMessage),
    /// Print the command list.
    Help,
    /// Leave the game and exit.
    Quit,
}

pub const HELP: &str = "\
commands:
  move <row> <col>   place a piece (0-based)
  chat <text>        send a chat message
  surrender          offer to surrender
  accept | reject    answer the opponent's surrender offer
  reset              start a new game after the current one ends
  state              show the board
  quit               leave the game";

/// Parses one line typed by the user.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let msg = match verb.to_ascii_lowercase().as_str() {
        "" => return Err(CommandError::Empty),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        "move" | "m" => parse_move(rest)?,
        "chat" | "say" => {
            if rest.is_empty() {
                return Err(CommandError::EmptyChat);
            }
            ClientMessage::Chat {
                message: rest.to_string(),
                player_name: None,
            }
        }
        "surrender" => ClientMessage::SurrenderRequest,
        "accept" => ClientMessage::SurrenderResponse { accept: true },
        "reject" => ClientMessage::SurrenderResponse { accept: false },
        "reset" => ClientMessage::Reset,
        "state" => ClientMessage::GetState,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Command::Send(msg))
}

fn parse_move(args: &str) -> Result<ClientMessage, CommandError> {
    let mut parts = args.split_whitespace();
    let (Some(row), Some(col), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CommandError::MoveUsage);
    };
    Ok(ClientMessage::Move {
        row: coordinate(row)?,
        col: coordinate(col)?,
    })
}

fn coordinate(s: &str) -> Result<u8, CommandError> {
    s.parse::<u8>()
        .ok()
        .filter(|&v| (v as usize) < BOARD_SIZE)
        .ok_or_else(|| CommandError::BadCoordinate(s.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
