//! Criterion benchmarks for the Othello board engine.
//!
//! Every move the server accepts runs `is_legal`, `apply` and two
//! `has_legal_move` scans under the session lock, so these are the calls
//! worth watching.
//!
//! Run with:
//! ```bash
//! cargo bench --package othello-core --bench board_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use othello_core::{Board, Color, Position};

// ── Board fixtures ────────────────────────────────────────────────────────────

fn opening() -> Board {
    Board::new()
}

/// Plays the first legal move for whoever is to move, `plies` times.
fn midgame(plies: usize) -> (Board, Color) {
    let mut board = Board::new();
    let mut turn = Color::Black;
    for _ in 0..plies {
        let Some(&pos) = board.legal_moves(turn).first() else {
            break;
        };
        board.apply(pos, turn);
        if board.has_legal_move(turn.opponent()) {
            turn = turn.opponent();
        }
    }
    (board, turn)
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_is_legal(c: &mut Criterion) {
    let board = opening();
    let legal = Position::new(2, 3).unwrap();
    let illegal = Position::new(0, 0).unwrap();

    let mut group = c.benchmark_group("is_legal");
    group.bench_function("legal", |b| {
        b.iter(|| black_box(board.is_legal(black_box(legal), Color::Black)))
    });
    group.bench_function("illegal", |b| {
        b.iter(|| black_box(board.is_legal(black_box(illegal), Color::Black)))
    });
    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    let board = opening();
    let pos = Position::new(2, 3).unwrap();

    c.bench_function("apply/opening", |b| {
        b.iter(|| {
            let mut copy = board;
            black_box(copy.apply(black_box(pos), Color::Black))
        })
    });
}

fn bench_legal_moves(c: &mut Criterion) {
    let mut group = c.benchmark_group("legal_moves");
    for plies in [0usize, 10, 30, 50] {
        let (board, turn) = midgame(plies);
        group.bench_with_input(BenchmarkId::from_parameter(plies), &board, |b, board| {
            b.iter(|| black_box(board.legal_moves(turn)))
        });
    }
    group.finish();
}

fn bench_has_legal_move(c: &mut Criterion) {
    let (board, turn) = midgame(30);

    c.bench_function("has_legal_move/midgame", |b| {
        b.iter(|| black_box(board.has_legal_move(black_box(turn))))
    });
}

criterion_group!(
    benches,
    bench_is_legal,
    bench_apply,
    bench_legal_moves,
    bench_has_legal_move
);
criterion_main!(benches);
