//! Wire message types shared by the server and its clients.
//!
//! Every message is a JSON object with a `"type"` field that identifies the
//! variant.  All other fields are flattened into the same object:
//!
//! ```json
//! {"type":"connect","game_id":"game1","player_name":"Ana"}
//! {"type":"move","row":2,"col":3}
//! {"type":"move","row":2,"col":3,"color":"black","next_turn":"white","flipped":[{"row":3,"col":3}]}
//! ```
//!
//! # Why separate client→server and server→client types?
//!
//! The two directions carry different information (a client `move` is just
//! a coordinate; the server `move` is the applied result).  Using two distinct
//! enums makes it a compile-time error to send a server event from a client,
//! and lets each side match exhaustively on what it can actually receive.

use serde::{Deserialize, Serialize};

use crate::domain::board::{Color, Position, Rows};

/// Game identifier used when a client does not name one.
pub const DEFAULT_GAME_ID: &str = "game1";

/// Display name used when a client does not provide one.
pub const DEFAULT_PLAYER_NAME: &str = "Player";

// ── Client → Server messages ──────────────────────────────────────────────────

/// All requests a client can send to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Asks for a seat in the game `game_id`.
    ///
    /// Must be the first message on a connection.  Missing fields fall back
    /// to the server's configured defaults.
    Connect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_name: Option<String>,
    },

    /// Places a piece at (`row`, `col`) for the sender's color.
    Move { row: u8, col: u8 },

    /// Posts a chat message to the game.
    Chat {
        message: String,
        /// Display name the client believes it has.  Informational only; the
        /// server always uses the name bound to the sender's seat.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_name: Option<String>,
    },

    /// Offers to surrender the current game.
    SurrenderRequest,

    /// Answers the opponent's pending surrender offer.
    SurrenderResponse { accept: bool },

    /// Starts a fresh game on the same seats after a game has finished.
    Reset,

    /// Asks for the single most relevant pending event (poll binding) or the
    /// current snapshot.
    GetState,

    /// Leaves the game gracefully.  Equivalent to closing the connection.
    Disconnect,
}

// ── Server → Client messages ──────────────────────────────────────────────────

/// Result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Black,
    White,
    Tie,
}

impl From<Color> for Winner {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Winner::Black,
            Color::White => Winner::White,
        }
    }
}

/// A chat entry as delivered to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Monotonically increasing id, unique within a session.
    pub id: u64,
    /// Color of the sender's seat.
    pub color: Color,
    pub player_name: String,
    pub message: String,
    /// Unix time in milliseconds at which the server accepted the message.
    pub timestamp: u64,
}

/// A seated player as reported in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub color: Color,
    pub name: String,
}

/// Stable machine-readable error codes carried by [`ServerMessage::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RoomFull,
    NameTaken,
    NotYourTurn,
    IllegalMove,
    GameAlreadyOver,
    GameNotStarted,
    GameNotOver,
    UnknownSession,
    NoPendingSurrender,
    SurrenderAlreadyPending,
    CannotAnswerOwnSurrender,
    NotSeated,
    EmptyMessage,
    InvalidMessage,
    NotConnected,
}

/// All events and replies the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The sender now holds a seat.
    Connected {
        color: Color,
        game_id: String,
        /// `true` when this join filled the second seat (or re-filled a seat
        /// in a game that was already running).
        game_started: bool,
    },

    /// Both seats are filled and play begins.
    GameStart { current_turn: Color },

    /// A move was applied.
    Move {
        row: u8,
        col: u8,
        color: Color,
        /// Whose turn it is now; `null` when the move ended the game.
        next_turn: Option<Color>,
        /// Cells flipped by this move.
        #[serde(default)]
        flipped: Vec<Position>,
        /// Set when the opponent has no legal reply and the mover keeps the turn.
        #[serde(default, skip_serializing_if = "is_false")]
        no_valid_moves: bool,
    },

    /// A chat message.
    Chat(ChatEntry),

    /// The game ended.
    GameOver {
        winner: Winner,
        black_count: u8,
        white_count: u8,
        #[serde(default, skip_serializing_if = "is_false")]
        surrender: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        surrendered_by: Option<String>,
    },

    /// A player offered to surrender.
    SurrenderRequest { requester: String },

    /// The pending surrender offer was declined.
    SurrenderCancelled { requester: String },

    /// A surrender offer was accepted.
    GameOverSurrender {
        /// Display name of the player who accepted (and therefore won).
        winner: String,
        surrendered_by: String,
    },

    /// The player to move had no legal move; the turn went back to the opponent.
    NoValidMoves { current_turn: Color },

    /// The finished game was replaced by a fresh one on the same seats.
    GameReset { current_turn: Color },

    /// Full snapshot of the session as seen by one player.
    GameState {
        current_turn: Option<Color>,
        black_count: u8,
        white_count: u8,
        board: Rows,
        players: Vec<PlayerInfo>,
        /// Chat entries this player had not seen yet.
        chat_messages: Vec<ChatEntry>,
        game_over: bool,
    },

    /// The request was accepted and produced nothing else for the requester.
    Ack,

    /// The request was rejected.  Only ever sent to the requester.
    Error { code: ErrorCode, message: String },
}

impl ServerMessage {
    /// Returns the `"type"` tag of this message, for log lines that must not
    /// include chat text or player names.
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::Connected { .. } => "connected",
            ServerMessage::GameStart { .. } => "game_start",
            ServerMessage::Move { .. } => "move",
            ServerMessage::Chat(_) => "chat",
            ServerMessage::GameOver { .. } => "game_over",
            ServerMessage::SurrenderRequest { .. } => "surrender_request",
            ServerMessage::SurrenderCancelled { .. } => "surrender_cancelled",
            ServerMessage::GameOverSurrender { .. } => "game_over_surrender",
            ServerMessage::NoValidMoves { .. } => "no_valid_moves",
            ServerMessage::GameReset { .. } => "game_reset",
            ServerMessage::GameState { .. } => "game_state",
            ServerMessage::Ack => "ack",
            ServerMessage::Error { .. } => "error",
        }
    }
}

impl ClientMessage {
    /// Returns the `"type"` tag of this message.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::Connect { .. } => "connect",
            ClientMessage::Move { .. } => "move",
            ClientMessage::Chat { .. } => "chat",
            ClientMessage::SurrenderRequest => "surrender_request",
            ClientMessage::SurrenderResponse { .. } => "surrender_response",
            ClientMessage::Reset => "reset",
            ClientMessage::GetState => "get_state",
            ClientMessage::Disconnect => "disconnect",
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

// ── Tests ─────────────────────────────────────────────────────────────────────
