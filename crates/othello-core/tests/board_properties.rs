//! Property-style integration tests for the board engine.
//!
//! These tests play many complete games with a small deterministic
//! pseudo-random move picker and check the engine's invariants after every
//! single move:
//!
//! - a legal move strictly increases the piece total by exactly one,
//! - the mover's count goes up by `1 + flipped`, the opponent's goes down by
//!   `flipped`,
//! - black + white + empty is always 64,
//! - `is_legal` agrees with `legal_moves` and with `apply`.

use othello_core::{Board, Color, Position, BOARD_SIZE};

/// Tiny linear congruential generator so the tests are reproducible without
/// pulling in a randomness crate.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }
}

/// Plays one game to completion, returning the final board.
///
/// Follows the same turn rule as the server: the turn passes to the opponent
/// when they can move, stays with the mover when only the mover can, and the
/// game ends when nobody can.
fn play_out(seed: u64, mut check: impl FnMut(&Board, &Board, Position, Color, &[Position])) -> Board {
    let mut rng = Lcg(seed);
    let mut board = Board::new();
    let mut turn = Color::Black;

    loop {
        let moves = board.legal_moves(turn);
        if moves.is_empty() {
            break;
        }
        let pick = moves[(rng.next() as usize) % moves.len()];
        let before = board;
        let flipped = board.apply(pick, turn);
        check(&before, &board, pick, turn, &flipped);

        if board.has_legal_move(turn.opponent()) {
            turn = turn.opponent();
        } else if !board.has_legal_move(turn) {
            break;
        }
    }

    board
}

#[test]
fn test_every_legal_move_adds_exactly_one_piece() {
    for seed in 0..50 {
        play_out(seed, |before, after, _pos, _color, flipped| {
            assert!(!flipped.is_empty(), "legal move must flip at least one piece");
            assert_eq!(after.score().total(), before.score().total() + 1);
        });
    }
}

#[test]
fn test_mover_never_loses_pieces_and_opponent_loses_exactly_the_flips() {
    for seed in 100..150 {
        play_out(seed, |before, after, _pos, color, flipped| {
            let n = flipped.len() as u8;
            assert_eq!(after.score().of(color), before.score().of(color) + 1 + n);
            assert_eq!(
                after.score().of(color.opponent()),
                before.score().of(color.opponent()) - n
            );
        });
    }
}

#[test]
fn test_cell_counts_always_sum_to_sixty_four() {
    for seed in 200..230 {
        play_out(seed, |_before, after, _pos, _color, _flipped| {
            let s = after.score();
            assert_eq!(
                s.black as usize + s.white as usize + after.empty_count() as usize,
                BOARD_SIZE * BOARD_SIZE
            );
        });
    }
}

#[test]
fn test_finished_games_leave_no_legal_moves_for_either_color() {
    for seed in 300..320 {
        let end = play_out(seed, |_, _, _, _, _| {});
        assert!(!end.has_legal_move(Color::Black));
        assert!(!end.has_legal_move(Color::White));
    }
}

#[test]
fn test_flipped_cells_now_belong_to_mover() {
    for seed in 400..420 {
        play_out(seed, |before, after, pos, color, flipped| {
            assert_eq!(after.cell(pos), Some(color));
            for &f in flipped {
                assert_eq!(before.cell(f), Some(color.opponent()));
                assert_eq!(after.cell(f), Some(color));
            }
        });
    }
}

#[test]
fn test_is_legal_agrees_with_legal_moves_on_every_cell() {
    let mut board = Board::new();
    board.apply(Position::new(2, 3).unwrap(), Color::Black);

    let listed = board.legal_moves(Color::White);
    for row in 0..BOARD_SIZE as u8 {
        for col in 0..BOARD_SIZE as u8 {
            let pos = Position::new(row, col).unwrap();
            assert_eq!(board.is_legal(pos, Color::White), listed.contains(&pos));
        }
    }
}

#[test]
fn test_opening_scenario_one_legal_and_one_illegal_coordinate() {
    let board = Board::new();

    // (2,3) flanks white (3,3) against black (4,3) along column 3.
    assert!(board.is_legal(Position::new(2, 3).unwrap(), Color::Black));
    // (2,2) touches white (3,3) diagonally, but (4,4) behind it is white too.
    assert!(!board.is_legal(Position::new(2, 2).unwrap(), Color::Black));
}
