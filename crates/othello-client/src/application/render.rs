//! Plain-text rendering of server messages.

use std::fmt::Write as _;

use othello_core::domain::board::Rows;
use othello_core::protocol::Winner;
use othello_core::{Color, ServerMessage};

fn glyph(cell: Option<Color>) -> char {
    match cell {
        Some(Color::Black) => 'X',
        Some(Color::White) => 'O',
        None => '.',
    }
}

/// Renders the board with 0-based row and column headers.
///
/// ```text
///   0 1 2 3 4 5 6 7
/// 0 . . . . . . . .
/// ...
/// 3 . . . O X . . .
/// ```
pub fn render_board(rows: &Rows) -> String {
    let mut out = String::from(" ");
    for col in 0..rows.len() {
        let _ = write!(out, " {col}");
    }
    for (r, row) in rows.iter().enumerate() {
        let _ = write!(out, "\n{r}");
        for cell in row {
            let _ = write!(out, " {}", glyph(*cell));
        }
    }
    out
}

fn winner_text(winner: Winner) -> &'static str {
    match winner {
        Winner::Black => "black wins",
        Winner::White => "white wins",
        Winner::Tie => "tie",
    }
}

/// Renders one server message as one or more lines of text.
pub fn render_message(msg: &ServerMessage) -> String {
    match msg {
        ServerMessage::Connected {
            color,
            game_id,
            game_started,
        } => {
            let status = if *game_started {
                "game in progress"
            } else {
                "waiting for an opponent"
            };
            format!("joined {game_id} as {color} ({status})")
        }
        ServerMessage::GameStart { current_turn } => {
            format!("game started, {current_turn} to move")
        }
        ServerMessage::Move {
            row,
            col,
            color,
            next_turn,
            flipped,
            no_valid_moves,
        } => {
            let mut line = format!("{color} played ({row}, {col}), flipped {}", flipped.len());
            match next_turn {
                Some(next) if *no_valid_moves => {
                    let _ = write!(line, "; {} has no valid moves, {next} again", next.opponent());
                }
                Some(next) => {
                    let _ = write!(line, "; {next} to move");
                }
                None => line.push_str("; game finished"),
            }
            line
        }
        ServerMessage::Chat(entry) => {
            format!("[{}] {}: {}", entry.color, entry.player_name, entry.message)
        }
        ServerMessage::GameOver {
            winner,
            black_count,
            white_count,
            surrendered_by,
            ..
        } => match surrendered_by {
            Some(loser) => format!(
                "game over: {} ({loser} surrendered)",
                winner_text(*winner)
            ),
            None => format!(
                "game over: {} ({black_count}-{white_count})",
                winner_text(*winner)
            ),
        },
        ServerMessage::SurrenderRequest { requester } => {
            format!("{requester} offers to surrender (accept / reject)")
        }
        ServerMessage::SurrenderCancelled { requester } => {
            format!("surrender offer by {requester} withdrawn")
        }
        ServerMessage::GameOverSurrender {
            winner,
            surrendered_by,
        } => format!("{surrendered_by} surrendered, {winner} wins"),
        ServerMessage::NoValidMoves { current_turn } => {
            format!("no valid moves, {current_turn} moves again")
        }
        ServerMessage::GameReset { current_turn } => {
            format!("game reset, {current_turn} to move")
        }
        ServerMessage::GameState {
            current_turn,
            black_count,
            white_count,
            board,
            players,
            chat_messages,
            game_over,
        } => {
            let mut out = render_board(board);
            let names: Vec<String> = players
                .iter()
                .map(|p| format!("{} ({})", p.name, p.color))
                .collect();
            let _ = write!(out, "\nblack {black_count} / white {white_count}");
            if !names.is_empty() {
                let _ = write!(out, "  players: {}", names.join(", "));
            }
            match (game_over, current_turn) {
                (true, _) => out.push_str("\ngame over"),
                (false, Some(turn)) => {
                    let _ = write!(out, "\n{turn} to move");
                }
                (false, None) => {}
            }
            for entry in chat_messages {
                let _ = write!(
                    out,
                    "\n[{}] {}: {}",
                    entry.color, entry.player_name, entry.message
                );
            }
            out
        }
        ServerMessage::Ack => "ok".to_string(),
        ServerMessage::Error { message, .. } => format!("error: {message}"),
    }
}
