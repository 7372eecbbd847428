//! Game session state machine.
//!
//! A [`GameSession`] is the authoritative state of one match: the board, the
//! two seats, the phase, whose turn it is, the chat log, a pending surrender
//! offer and the final result.  It is a plain synchronous value with no I/O;
//! the registry wraps it in a lock and routes its events to transports.
//!
//! # Phases
//!
//! ```text
//! WaitingForPlayers ──(second seat filled)──► InProgress ──(no moves / surrender)──► GameOver
//!         ▲                                                                              │
//!         └──────────────────────────────(reset, one seat empty)─────────────────────────┤
//!                                     InProgress ◄──(reset, both seats filled)───────────┘
//! ```
//!
//! A pending surrender offer is a sub-state of `InProgress`: moves and chat
//! stay allowed while it is open.
//!
//! # Events
//!
//! Every mutating operation returns the list of [`SessionEvent`]s it
//! produced, each addressed to an [`Audience`].  The push binding delivers
//! them immediately; the poll binding keeps one-shot notices per seat and
//! serves them through [`GameSession::poll_view`].

use std::time::{SystemTime, UNIX_EPOCH};

use othello_core::protocol::{PlayerInfo, Winner};
use othello_core::{Board, Color, ErrorCode, Position, Score, ServerMessage};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::chat::ChatLog;

/// Identifies one connection's claim on a seat.  Minted fresh per connection.
pub type PlayerId = Uuid;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Reasons a session operation can be rejected.
///
/// Each variant maps to a stable wire [`ErrorCode`].  A rejected operation
/// never changes session state and is only ever reported to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("game already has two players")]
    RoomFull,

    #[error("the name '{0}' is already taken in this game")]
    NameTaken(String),

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("illegal move at ({row}, {col})")]
    IllegalMove { row: u8, col: u8 },

    #[error("the game is already over")]
    GameAlreadyOver,

    #[error("the game has not started yet")]
    GameNotStarted,

    #[error("the game is still in progress")]
    GameNotOver,

    #[error("unknown game session '{0}'")]
    UnknownSession(String),

    #[error("there is no pending surrender request")]
    NoPendingSurrender,

    #[error("a surrender request is already pending")]
    SurrenderAlreadyPending,

    #[error("you cannot answer your own surrender request")]
    CannotAnswerOwnSurrender,

    #[error("you do not hold a seat in this game")]
    NotSeated,

    #[error("chat message is empty")]
    EmptyMessage,
}

impl GameError {
    /// Returns the wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            GameError::RoomFull => ErrorCode::RoomFull,
            GameError::NameTaken(_) => ErrorCode::NameTaken,
            GameError::NotYourTurn => ErrorCode::NotYourTurn,
            GameError::IllegalMove { .. } => ErrorCode::IllegalMove,
            GameError::GameAlreadyOver => ErrorCode::GameAlreadyOver,
            GameError::GameNotStarted => ErrorCode::GameNotStarted,
            GameError::GameNotOver => ErrorCode::GameNotOver,
            GameError::UnknownSession(_) => ErrorCode::UnknownSession,
            GameError::NoPendingSurrender => ErrorCode::NoPendingSurrender,
            GameError::SurrenderAlreadyPending => ErrorCode::SurrenderAlreadyPending,
            GameError::CannotAnswerOwnSurrender => ErrorCode::CannotAnswerOwnSurrender,
            GameError::NotSeated => ErrorCode::NotSeated,
            GameError::EmptyMessage => ErrorCode::EmptyMessage,
        }
    }

    /// Builds the `error` message sent back to the requester.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Who an event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Only(Color),
    AllExcept(Color),
}

impl Audience {
    pub fn includes(self, color: Color) -> bool {
        match self {
            Audience::All => true,
            Audience::Only(c) => c == color,
            Audience::AllExcept(c) => c != color,
        }
    }
}

/// One outbound message produced by a session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub audience: Audience,
    pub message: ServerMessage,
}

impl SessionEvent {
    fn to_all(message: ServerMessage) -> Self {
        Self {
            audience: Audience::All,
            message,
        }
    }

    fn to_only(color: Color, message: ServerMessage) -> Self {
        Self {
            audience: Audience::Only(color),
            message,
        }
    }

    fn to_all_except(color: Color, message: ServerMessage) -> Self {
        Self {
            audience: Audience::AllExcept(color),
            message,
        }
    }
}

// ── Session state ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitingForPlayers,
    InProgress,
    GameOver,
}

/// A filled seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub player_id: PlayerId,
    pub name: String,
}

/// How a finished game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub winner: Winner,
    pub score: Score,
    /// Name of the player whose surrender was accepted, when the game ended
    /// that way.
    pub surrendered_by: Option<String>,
}

impl GameResult {
    fn to_message(&self) -> ServerMessage {
        ServerMessage::GameOver {
            winner: self.winner,
            black_count: self.score.black,
            white_count: self.score.white,
            surrender: self.surrendered_by.is_some(),
            surrendered_by: self.surrendered_by.clone(),
        }
    }
}

/// What a successful join produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub color: Color,
    pub events: Vec<SessionEvent>,
    /// `true` when the joiner took a vacated seat in a game that had already
    /// started, and therefore needs a snapshot to catch up.
    pub resumed: bool,
}

/// One-shot notices kept for the poll binding, per seat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PollNotices {
    surrender_outcome: Option<ServerMessage>,
    game_start: bool,
    no_valid_moves: bool,
}

/// Authoritative state of one match.
#[derive(Debug)]
pub struct GameSession {
    game_id: String,
    board: Board,
    seats: [Option<Seat>; 2],
    phase: Phase,
    current_turn: Option<Color>,
    chat: ChatLog,
    surrender_requester: Option<Color>,
    result: Option<GameResult>,
    notices: [PollNotices; 2],
}

impl GameSession {
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            board: Board::new(),
            seats: [None, None],
            phase: Phase::WaitingForPlayers,
            current_turn: Some(Color::Black),
            chat: ChatLog::new(),
            surrender_requester: None,
            result: None,
            notices: Default::default(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whose turn it is.  `None` exactly when the game is over.
    pub fn current_turn(&self) -> Option<Color> {
        self.current_turn
    }

    pub fn seat(&self, color: Color) -> Option<&Seat> {
        self.seats[color.index()].as_ref()
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    /// Color of the player currently pending a surrender, if any.
    pub fn pending_surrender(&self) -> Option<Color> {
        self.surrender_requester
    }

    #[cfg(test)]
    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    /// Returns the seat color held by `player_id`.
    pub fn color_of(&self, player_id: PlayerId) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|c| matches!(self.seat(*c), Some(seat) if seat.player_id == player_id))
    }

    pub fn occupied_seats(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    fn seated(&self, player_id: PlayerId) -> Result<Color, GameError> {
        self.color_of(player_id).ok_or(GameError::NotSeated)
    }

    fn name_of(&self, color: Color) -> String {
        self.seat(color)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| color.to_string())
    }

    // ── Membership ────────────────────────────────────────────────────────────

    /// Seats `name` in the first vacant seat, black first.
    ///
    /// # Errors
    ///
    /// [`GameError::NameTaken`] when the other seat already uses `name`,
    /// [`GameError::RoomFull`] when both seats are occupied.
    pub fn join(&mut self, player_id: PlayerId, name: &str) -> Result<JoinOutcome, GameError> {
        if self.seats.iter().flatten().any(|s| s.name == name) {
            return Err(GameError::NameTaken(name.to_string()));
        }
        let color = Color::ALL
            .into_iter()
            .find(|c| self.seat(*c).is_none())
            .ok_or(GameError::RoomFull)?;

        self.seats[color.index()] = Some(Seat {
            player_id,
            name: name.to_string(),
        });
        info!("game {}: {name} joined as {color}", self.game_id);

        let mut events = Vec::new();
        let resumed = match self.phase {
            Phase::WaitingForPlayers if self.occupied_seats() == 2 => {
                self.phase = Phase::InProgress;
                self.current_turn = Some(Color::Black);
                events.push(SessionEvent::to_only(color, self.connected(color, true)));
                events.push(SessionEvent::to_all(ServerMessage::GameStart {
                    current_turn: Color::Black,
                }));
                self.notices[color.opponent().index()].game_start = true;
                info!("game {}: both seats filled, game started", self.game_id);
                false
            }
            Phase::WaitingForPlayers => {
                events.push(SessionEvent::to_only(color, self.connected(color, false)));
                false
            }
            Phase::InProgress | Phase::GameOver => {
                events.push(SessionEvent::to_only(color, self.connected(color, true)));
                true
            }
        };

        Ok(JoinOutcome {
            color,
            events,
            resumed,
        })
    }

    fn connected(&self, color: Color, game_started: bool) -> ServerMessage {
        ServerMessage::Connected {
            color,
            game_id: self.game_id.clone(),
            game_started,
        }
    }

    /// Vacates the seat held by `player_id`.
    ///
    /// The session, its phase and its turn are untouched: the seat can be
    /// refilled by a later join.  A surrender offer made by the leaver is
    /// withdrawn.
    pub fn leave(&mut self, player_id: PlayerId) -> Vec<SessionEvent> {
        let Some(color) = self.color_of(player_id) else {
            return Vec::new();
        };
        let name = self.name_of(color);
        self.seats[color.index()] = None;
        self.notices[color.index()] = PollNotices::default();
        info!("game {}: {name} ({color}) left", self.game_id);

        if self.surrender_requester == Some(color) {
            self.surrender_requester = None;
            return vec![SessionEvent::to_all_except(
                color,
                ServerMessage::SurrenderCancelled { requester: name },
            )];
        }
        Vec::new()
    }

    // ── Play ──────────────────────────────────────────────────────────────────

    /// Applies a move for the player's color and sequences the turn.
    ///
    /// After a legal move:
    /// - the opponent can move → the turn passes,
    /// - only the mover can move → the mover keeps the turn and the move
    ///   event carries `no_valid_moves`,
    /// - nobody can move → the game ends and a `game_over` event follows.
    pub fn submit_move(
        &mut self,
        player_id: PlayerId,
        row: u8,
        col: u8,
    ) -> Result<Vec<SessionEvent>, GameError> {
        let color = self.seated(player_id)?;
        match self.phase {
            Phase::GameOver => return Err(GameError::GameAlreadyOver),
            Phase::WaitingForPlayers => return Err(GameError::GameNotStarted),
            Phase::InProgress => {}
        }
        if self.current_turn != Some(color) {
            return Err(GameError::NotYourTurn);
        }
        let pos = Position::new(row, col).ok_or(GameError::IllegalMove { row, col })?;
        let flipped = self.board.apply(pos, color);
        if flipped.is_empty() {
            return Err(GameError::IllegalMove { row, col });
        }
        debug!(
            "game {}: {color} played {pos}, flipped {}",
            self.game_id,
            flipped.len()
        );

        let opponent = color.opponent();
        let mut events = Vec::with_capacity(2);
        if self.board.has_legal_move(opponent) {
            self.current_turn = Some(opponent);
            events.push(SessionEvent::to_all(move_event(pos, color, Some(opponent), flipped, false)));
        } else if self.board.has_legal_move(color) {
            self.current_turn = Some(color);
            for notices in &mut self.notices {
                notices.no_valid_moves = true;
            }
            info!("game {}: {opponent} has no valid moves, {color} plays again", self.game_id);
            events.push(SessionEvent::to_all(move_event(pos, color, Some(color), flipped, true)));
        } else {
            events.push(SessionEvent::to_all(move_event(pos, color, None, flipped, false)));
            let score = self.board.score();
            let winner = match score.black.cmp(&score.white) {
                std::cmp::Ordering::Greater => Winner::Black,
                std::cmp::Ordering::Less => Winner::White,
                std::cmp::Ordering::Equal => Winner::Tie,
            };
            let result = GameResult {
                winner,
                score,
                surrendered_by: None,
            };
            events.push(SessionEvent::to_all(result.to_message()));
            self.finish(result);
        }

        Ok(events)
    }

    fn finish(&mut self, result: GameResult) {
        info!(
            "game {}: game over, winner {:?} ({}-{})",
            self.game_id, result.winner, result.score.black, result.score.white
        );
        self.phase = Phase::GameOver;
        self.current_turn = None;
        self.surrender_requester = None;
        self.result = Some(result);
    }

    // ── Surrender ─────────────────────────────────────────────────────────────

    /// Opens a surrender offer on behalf of `player_id`.
    pub fn request_surrender(&mut self, player_id: PlayerId) -> Result<Vec<SessionEvent>, GameError> {
        let color = self.seated(player_id)?;
        match self.phase {
            Phase::GameOver => return Err(GameError::GameAlreadyOver),
            Phase::WaitingForPlayers => return Err(GameError::GameNotStarted),
            Phase::InProgress => {}
        }
        if self.surrender_requester.is_some() {
            return Err(GameError::SurrenderAlreadyPending);
        }

        self.surrender_requester = Some(color);
        let requester = self.name_of(color);
        info!("game {}: {requester} offered to surrender", self.game_id);
        Ok(vec![SessionEvent::to_all(ServerMessage::SurrenderRequest {
            requester,
        })])
    }

    /// Answers the opponent's surrender offer.
    ///
    /// Accepting ends the game with the responder as winner.  Rejecting
    /// withdraws the offer and play continues on the same turn.
    pub fn respond_surrender(
        &mut self,
        player_id: PlayerId,
        accept: bool,
    ) -> Result<Vec<SessionEvent>, GameError> {
        let color = self.seated(player_id)?;
        let requester = self
            .surrender_requester
            .ok_or(GameError::NoPendingSurrender)?;
        if requester == color {
            return Err(GameError::CannotAnswerOwnSurrender);
        }

        let requester_name = self.name_of(requester);
        let outcome = if accept {
            let winner = self.name_of(color);
            self.finish(GameResult {
                winner: Winner::from(color),
                score: self.board.score(),
                surrendered_by: Some(requester_name.clone()),
            });
            ServerMessage::GameOverSurrender {
                winner,
                surrendered_by: requester_name,
            }
        } else {
            self.surrender_requester = None;
            info!("game {}: surrender by {requester_name} declined", self.game_id);
            ServerMessage::SurrenderCancelled {
                requester: requester_name,
            }
        };

        self.notices[requester.index()].surrender_outcome = Some(outcome.clone());
        Ok(vec![SessionEvent::to_all(outcome)])
    }

    // ── Chat ──────────────────────────────────────────────────────────────────

    /// Appends a chat message from `player_id`.
    pub fn send_chat(&mut self, player_id: PlayerId, text: &str) -> Result<Vec<SessionEvent>, GameError> {
        let color = self.seated(player_id)?;
        if self.phase == Phase::GameOver {
            return Err(GameError::GameAlreadyOver);
        }
        if text.trim().is_empty() {
            return Err(GameError::EmptyMessage);
        }

        let name = self.name_of(color);
        let entry = self.chat.append(color, &name, text, now_millis());
        debug!("game {}: chat #{} from {color}", self.game_id, entry.id);
        Ok(vec![SessionEvent::to_all(ServerMessage::Chat(entry))])
    }

    /// Records that the player in seat `color` has received chat entry `id`.
    pub fn mark_chat_read(&mut self, id: u64, color: Color) {
        if let Some(seat) = &self.seats[color.index()] {
            self.chat.mark_read(id, &seat.name);
        }
    }

    // ── Reset ─────────────────────────────────────────────────────────────────

    /// Starts a new game on the same seats.  Only valid once the game is over.
    pub fn reset(&mut self, player_id: PlayerId) -> Result<Vec<SessionEvent>, GameError> {
        let color = self.seated(player_id)?;
        if self.phase != Phase::GameOver {
            return Err(GameError::GameNotOver);
        }
        self.restart();
        if self.phase == Phase::InProgress {
            self.notices[color.opponent().index()].game_start = true;
        }
        Ok(vec![self.reset_event()])
    }

    /// Resets the session regardless of phase.  Administrative use only.
    pub fn force_reset(&mut self) -> Vec<SessionEvent> {
        self.restart();
        if self.phase == Phase::InProgress {
            for notices in &mut self.notices {
                notices.game_start = true;
            }
        }
        vec![self.reset_event()]
    }

    fn restart(&mut self) {
        self.board = Board::new();
        self.chat.clear();
        self.surrender_requester = None;
        self.result = None;
        self.notices = Default::default();
        self.current_turn = Some(Color::Black);
        self.phase = if self.occupied_seats() == 2 {
            Phase::InProgress
        } else {
            Phase::WaitingForPlayers
        };
        info!("game {}: reset, phase {:?}", self.game_id, self.phase);
    }

    fn reset_event(&self) -> SessionEvent {
        SessionEvent::to_all(ServerMessage::GameReset {
            current_turn: Color::Black,
        })
    }

    // ── Views ─────────────────────────────────────────────────────────────────

    /// Full snapshot for the player in seat `color`.
    ///
    /// Unread chat entries are included and marked read.
    pub fn snapshot_for(&mut self, color: Color) -> ServerMessage {
        let chat_messages = match &self.seats[color.index()] {
            Some(seat) => self.chat.take_unread(&seat.name),
            None => Vec::new(),
        };
        let score = self.board.score();
        let players = Color::ALL
            .into_iter()
            .filter_map(|c| {
                self.seat(c).map(|s| PlayerInfo {
                    color: c,
                    name: s.name.clone(),
                })
            })
            .collect();

        ServerMessage::GameState {
            current_turn: self.current_turn,
            black_count: score.black,
            white_count: score.white,
            board: self.board.rows(),
            players,
            chat_messages,
            game_over: self.phase == Phase::GameOver,
        }
    }

    /// Returns the single most relevant item for a polling player.
    ///
    /// In priority order:
    /// 1. the opponent's pending surrender request (repeats while pending),
    /// 2. the outcome of the player's own surrender request (once),
    /// 3. the final result (repeats while the game is over),
    /// 4. a game start or reset notice (once),
    /// 5. a no-valid-moves notice (once),
    /// 6. a `game_state` snapshot carrying unread chat.
    pub fn poll_view(&mut self, player_id: PlayerId) -> Result<ServerMessage, GameError> {
        let color = self.seated(player_id)?;
        let opponent = color.opponent();

        if self.surrender_requester == Some(opponent) {
            return Ok(ServerMessage::SurrenderRequest {
                requester: self.name_of(opponent),
            });
        }
        let notices = &mut self.notices[color.index()];
        if let Some(outcome) = notices.surrender_outcome.take() {
            return Ok(outcome);
        }
        if let Some(result) = &self.result {
            return Ok(result.to_message());
        }
        if std::mem::take(&mut notices.game_start) {
            return Ok(ServerMessage::GameStart {
                current_turn: self.current_turn.unwrap_or(Color::Black),
            });
        }
        if std::mem::take(&mut notices.no_valid_moves) {
            if let Some(current_turn) = self.current_turn {
                return Ok(ServerMessage::NoValidMoves { current_turn });
            }
        }
        Ok(self.snapshot_for(color))
    }
}

fn move_event(
    pos: Position,
    color: Color,
    next_turn: Option<Color>,
    flipped: Vec<Position>,
    no_valid_moves: bool,
) -> ServerMessage {
    ServerMessage::Move {
        row: pos.row(),
        col: pos.col(),
        color,
        next_turn,
        flipped,
        no_valid_moves,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
