//! Client use cases: command parsing, interactive play and rendering.

pub mod commands;
pub mod play;
pub mod render;

pub use commands::{parse_command, Command, CommandError, HELP};
pub use play::{handle_line, GameClient, LineOutcome, SendError};
pub use render::{render_board, render_message};
