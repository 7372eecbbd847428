//! Othello board and rule engine.
//!
//! The board is an 8×8 grid where each cell is either empty or holds a black
//! or white piece.  All rule logic lives here: move legality (the "sandwich"
//! rule), move application with flips, exhaustive legal-move scans and
//! scoring.
//!
//! # The sandwich rule
//!
//! A move at an empty cell is legal when, in at least one of the eight
//! directions, the cells next to it form a run of one or more opponent
//! pieces that is closed off by a piece of the mover's own color:
//!
//! ```text
//!   . W W B      placing B on the left-most cell flanks both W pieces
//!   ^
//! ```
//!
//! A run that reaches an empty cell or the edge of the board before meeting
//! a same-color piece does not count.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of rows and columns on the board.
pub const BOARD_SIZE: usize = 8;

/// Total number of cells on the board.
pub const NUM_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// The eight unit-step directions as `(row delta, col delta)`.
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Piece color.  Black always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// Returns the other color.
    pub fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Stable index (black = 0, white = 1) for per-color arrays.
    pub fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }

    /// Both colors in seating order.
    pub const ALL: [Color; 2] = [Color::Black, Color::White];
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => f.write_str("black"),
            Color::White => f.write_str("white"),
        }
    }
}

/// A board coordinate, 0-indexed.  Always within `[0, 8)` on both axes.
///
/// Only [`Position::new`] builds one; deserialization goes through it too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    row: u8,
    col: u8,
}

#[derive(Deserialize)]
struct RawPosition {
    row: u8,
    col: u8,
}

impl TryFrom<RawPosition> for Position {
    type Error = String;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Position::new(raw.row, raw.col)
            .ok_or_else(|| format!("position ({}, {}) is off the board", raw.row, raw.col))
    }
}

impl Position {
    /// Returns `Some` when both coordinates are on the board.
    pub fn new(row: u8, col: u8) -> Option<Self> {
        if (row as usize) < BOARD_SIZE && (col as usize) < BOARD_SIZE {
            Some(Self { row, col })
        } else {
            None
        }
    }

    pub fn row(self) -> u8 {
        self.row
    }

    pub fn col(self) -> u8 {
        self.col
    }

    /// Steps one cell in direction `(dr, dc)`, or `None` when that leaves the board.
    fn step(self, dr: i32, dc: i32) -> Option<Self> {
        let row = self.row as i32 + dr;
        let col = self.col as i32 + dc;
        if (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col) {
            Some(Self {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Piece counts for both colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub black: u8,
    pub white: u8,
}

impl Score {
    /// Number of occupied cells.
    pub fn total(&self) -> u8 {
        self.black + self.white
    }

    /// Count for a single color.
    pub fn of(&self, color: Color) -> u8 {
        match color {
            Color::Black => self.black,
            Color::White => self.white,
        }
    }
}

/// Grid layout used on the wire: `rows[row][col]`.
pub type Rows = [[Option<Color>; BOARD_SIZE]; BOARD_SIZE];

/// Othello board state.
///
/// Only [`Board::apply`] mutates a board after construction, and it refuses
/// illegal moves, so every reachable board is a valid Othello position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: Rows,
}

impl Board {
    /// Creates the standard opening position:
    /// white at (3,3) and (4,4), black at (3,4) and (4,3).
    pub fn new() -> Self {
        let mut cells = [[None; BOARD_SIZE]; BOARD_SIZE];
        let mid = BOARD_SIZE / 2;
        cells[mid - 1][mid - 1] = Some(Color::White);
        cells[mid][mid] = Some(Color::White);
        cells[mid - 1][mid] = Some(Color::Black);
        cells[mid][mid - 1] = Some(Color::Black);
        Self { cells }
    }

    /// Builds a board from an explicit grid.
    ///
    /// Intended for tests and tooling that need a specific mid- or end-game
    /// position.
    pub fn from_rows(cells: Rows) -> Self {
        Self { cells }
    }

    /// Returns the piece at `pos`, if any.
    pub fn cell(&self, pos: Position) -> Option<Color> {
        self.cells[pos.row as usize][pos.col as usize]
    }

    /// Returns a copy of the grid for serialization.
    pub fn rows(&self) -> Rows {
        self.cells
    }

    /// Returns `true` iff `color` may play at `pos`.
    ///
    /// Never mutates the board.
    pub fn is_legal(&self, pos: Position, color: Color) -> bool {
        self.cell(pos).is_none()
            && DIRECTIONS
                .iter()
                .any(|&(dr, dc)| self.flank_length(pos, color, dr, dc) > 0)
    }

    /// Places a `color` piece at `pos` and flips every flanked run.
    ///
    /// Returns the flipped coordinates.  When the move is not legal the board
    /// is left untouched and the returned list is empty, so callers must
    /// treat an empty result as a rejected move.
    pub fn apply(&mut self, pos: Position, color: Color) -> Vec<Position> {
        if self.cell(pos).is_some() {
            return Vec::new();
        }

        // Measure every ray before mutating anything.
        let runs: Vec<(i32, i32, usize)> = DIRECTIONS
            .iter()
            .map(|&(dr, dc)| (dr, dc, self.flank_length(pos, color, dr, dc)))
            .filter(|&(_, _, n)| n > 0)
            .collect();

        if runs.is_empty() {
            return Vec::new();
        }

        self.set(pos, color);
        let mut flipped = Vec::new();
        for (dr, dc, n) in runs {
            let mut cursor = pos;
            for _ in 0..n {
                // The run was measured on-board, so stepping cannot fail here.
                let Some(next) = cursor.step(dr, dc) else {
                    break;
                };
                self.set(next, color);
                flipped.push(next);
                cursor = next;
            }
        }

        flipped
    }

    /// Returns every legal move for `color` in row-major order.
    pub fn legal_moves(&self, color: Color) -> Vec<Position> {
        all_positions()
            .filter(|&pos| self.is_legal(pos, color))
            .collect()
    }

    /// Returns `true` if `color` has at least one legal move.
    pub fn has_legal_move(&self, color: Color) -> bool {
        all_positions().any(|pos| self.is_legal(pos, color))
    }

    /// Returns the piece counts for both colors.
    pub fn score(&self) -> Score {
        let mut score = Score::default();
        for color in self.cells.iter().flatten().flatten() {
            match color {
                Color::Black => score.black += 1,
                Color::White => score.white += 1,
            }
        }
        score
    }

    /// Returns the number of empty cells.
    pub fn empty_count(&self) -> u8 {
        NUM_CELLS as u8 - self.score().total()
    }

    fn set(&mut self, pos: Position, color: Color) {
        self.cells[pos.row as usize][pos.col as usize] = Some(color);
    }

    /// Number of opponent pieces flanked by `color` starting next to `pos` in
    /// direction `(dr, dc)`.  Zero when the run is empty, open-ended, or runs
    /// off the board.
    fn flank_length(&self, pos: Position, color: Color, dr: i32, dc: i32) -> usize {
        let opponent = color.opponent();
        let mut count = 0;
        let mut cursor = pos;

        while let Some(next) = cursor.step(dr, dc) {
            match self.cell(next) {
                Some(c) if c == opponent => count += 1,
                Some(_) => return count,
                None => return 0,
            }
            cursor = next;
        }

        0
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    /// Renders the board as eight lines of `B`, `W` and `.` with row and
    /// column indices.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " ")?;
        for col in 0..BOARD_SIZE {
            write!(f, " {col}")?;
        }
        writeln!(f)?;
        for (r, row) in self.cells.iter().enumerate() {
            write!(f, "{r}")?;
            for cell in row {
                let ch = match cell {
                    Some(Color::Black) => 'B',
                    Some(Color::White) => 'W',
                    None => '.',
                };
                write!(f, " {ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn all_positions() -> impl Iterator<Item = Position> {
    (0..BOARD_SIZE as u8).flat_map(|row| (0..BOARD_SIZE as u8).map(move |col| Position { row, col }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: u8, col: u8) -> Position {
        Position::new(row, col).unwrap()
    }

    #[test]
    fn test_initial_board_has_two_pieces_per_color_in_centre() {
        let board = Board::new();

        assert_eq!(board.score(), Score { black: 2, white: 2 });
        assert_eq!(board.cell(pos(3, 3)), Some(Color::White));
        assert_eq!(board.cell(pos(4, 4)), Some(Color::White));
        assert_eq!(board.cell(pos(3, 4)), Some(Color::Black));
        assert_eq!(board.cell(pos(4, 3)), Some(Color::Black));
        assert_eq!(board.empty_count(), 60);
    }

    #[test]
    fn test_initial_black_legal_moves_are_four_expected_squares() {
        let board = Board::new();

        assert_eq!(
            board.legal_moves(Color::Black),
            vec![pos(2, 3), pos(3, 2), pos(4, 5), pos(5, 4)]
        );
    }

    #[test]
    fn test_initial_white_legal_moves_are_four_expected_squares() {
        let board = Board::new();

        assert_eq!(
            board.legal_moves(Color::White),
            vec![pos(2, 4), pos(3, 5), pos(4, 2), pos(5, 3)]
        );
    }

    #[test]
    fn test_apply_flips_flanked_piece_and_updates_counts() {
        let mut board = Board::new();

        let flipped = board.apply(pos(2, 3), Color::Black);

        assert_eq!(flipped, vec![pos(3, 3)]);
        assert_eq!(board.score(), Score { black: 4, white: 1 });
        assert_eq!(board.cell(pos(2, 3)), Some(Color::Black));
        assert_eq!(board.cell(pos(3, 3)), Some(Color::Black));
        assert_eq!(board.cell(pos(4, 4)), Some(Color::White));
    }

    #[test]
    fn test_illegal_apply_returns_empty_and_keeps_board_unchanged() {
        let mut board = Board::new();
        let before = board;

        let flipped = board.apply(pos(0, 0), Color::Black);

        assert!(flipped.is_empty());
        assert_eq!(board, before);
    }

    #[test]
    fn test_apply_on_occupied_cell_is_rejected() {
        let mut board = Board::new();
        let before = board;

        assert!(board.apply(pos(3, 3), Color::Black).is_empty());
        assert_eq!(board, before);
    }

    #[test]
    fn test_is_legal_does_not_mutate_and_is_repeatable() {
        let board = Board::new();
        let before = board;

        let first = board.is_legal(pos(2, 3), Color::Black);
        let second = board.is_legal(pos(2, 3), Color::Black);

        assert!(first);
        assert_eq!(first, second);
        assert_eq!(board, before);
    }

    #[test]
    fn test_open_ended_run_is_not_a_sandwich() {
        // Row 0: . W W . . . . .   — nothing closes the run for black.
        let mut rows = [[None; BOARD_SIZE]; BOARD_SIZE];
        rows[0][1] = Some(Color::White);
        rows[0][2] = Some(Color::White);
        let board = Board::from_rows(rows);

        assert!(!board.is_legal(pos(0, 0), Color::Black));
        assert!(!board.has_legal_move(Color::Black));
    }

    #[test]
    fn test_apply_flips_multiple_directions_at_once() {
        // Black plays (0,0) and flanks along both row 0 and column 0.
        let mut rows = [[None; BOARD_SIZE]; BOARD_SIZE];
        rows[0][1] = Some(Color::White);
        rows[0][2] = Some(Color::Black);
        rows[1][0] = Some(Color::White);
        rows[2][0] = Some(Color::White);
        rows[3][0] = Some(Color::Black);
        let mut board = Board::from_rows(rows);

        let mut flipped = board.apply(pos(0, 0), Color::Black);
        flipped.sort_by_key(|p| (p.row, p.col));

        assert_eq!(flipped, vec![pos(0, 1), pos(1, 0), pos(2, 0)]);
        assert_eq!(board.score(), Score { black: 6, white: 0 });
    }

    #[test]
    fn test_position_rejects_out_of_range_coordinates() {
        assert!(Position::new(8, 0).is_none());
        assert!(Position::new(0, 8).is_none());
        assert!(Position::new(7, 7).is_some());
    }

    #[test]
    fn test_position_deserialization_rejects_off_board_cells() {
        // Arrange
        let on_board = r#"{"row":2,"col":3}"#;
        let off_board = r#"{"row":200,"col":3}"#;

        // Act
        let parsed: Position = serde_json::from_str(on_board).unwrap();
        let rejected = serde_json::from_str::<Position>(off_board);

        // Assert
        assert_eq!((parsed.row(), parsed.col()), (2, 3));
        assert!(rejected.is_err());
        assert_eq!(serde_json::to_string(&parsed).unwrap(), on_board);
    }

    #[test]
    fn test_color_opponent_is_an_involution() {
        for color in Color::ALL {
            assert_ne!(color, color.opponent());
            assert_eq!(color, color.opponent().opponent());
        }
    }

    #[test]
    fn test_full_board_has_no_legal_moves() {
        let board = Board::from_rows([[Some(Color::White); BOARD_SIZE]; BOARD_SIZE]);

        assert!(!board.has_legal_move(Color::Black));
        assert!(!board.has_legal_move(Color::White));
        assert_eq!(board.empty_count(), 0);
    }

    #[test]
    fn test_color_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Color::Black).unwrap(), "\"black\"");
        assert_eq!(serde_json::to_string(&Color::White).unwrap(), "\"white\"");
    }

    #[test]
    fn test_display_renders_opening_position() {
        let text = Board::new().to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 9);
        assert_eq!(lines[4], "3 . . . W B . . .");
        assert_eq!(lines[5], "4 . . . B W . . .");
    }
}
