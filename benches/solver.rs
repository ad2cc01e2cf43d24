//! Benchmarks for the edge-matching puzzle solver.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use eterniton::config::SolverConfig;
use eterniton::edge_index::EdgeIndex;
use eterniton::engine::Engine;
use eterniton::piece::Piece;
use eterniton::puzzle::Puzzle;
use eterniton::shared::{CancelToken, SharedState};

/// Builds a deterministic, uniquely-solvable `rows` x `cols` grid: every
/// internal edge gets its own label, so exactly one assignment (modulo
/// the symmetry the engine itself breaks) fits.
fn grid_puzzle(rows: usize, cols: usize) -> Puzzle {
    let mut next_label = 1u16;
    let mut horizontal = vec![vec![0u16; cols.saturating_sub(1)]; rows];
    let mut vertical = vec![vec![0u16; cols]; rows.saturating_sub(1)];

    for row in horizontal.iter_mut() {
        for label in row.iter_mut() {
            *label = next_label;
            next_label += 1;
        }
    }
    for row in vertical.iter_mut() {
        for label in row.iter_mut() {
            *label = next_label;
            next_label += 1;
        }
    }

    let mut pieces = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let north = if r == 0 { 0 } else { vertical[r - 1][c] };
            let south = if r + 1 == rows { 0 } else { vertical[r][c] };
            let west = if c == 0 { 0 } else { horizontal[r][c - 1] };
            let east = if c + 1 == cols { 0 } else { horizontal[r][c] };
            let id = (r * cols + c + 1) as u32;
            pieces.push(Piece::new(id, [north, east, south, west]));
        }
    }

    Puzzle::new(rows, cols, pieces)
}

fn cancel_token() -> CancelToken {
    CancelToken::new(Arc::new(SharedState::new()))
}

fn bench_solve_4x4(c: &mut Criterion) {
    let puzzle = grid_puzzle(4, 4);
    c.bench_function("solve_4x4_grid", |b| {
        b.iter(|| {
            let mut engine = Engine::new(
                black_box(puzzle.clone()),
                SolverConfig::default(),
                cancel_token(),
                None,
            )
            .unwrap();
            engine.solve()
        })
    });
}

fn bench_solve_without_singletons(c: &mut Criterion) {
    let puzzle = grid_puzzle(4, 4);
    let mut config = SolverConfig::default();
    config.use_singletons = false;
    c.bench_function("solve_4x4_grid_no_singletons", |b| {
        b.iter(|| {
            let mut engine = Engine::new(
                black_box(puzzle.clone()),
                config.clone(),
                cancel_token(),
                None,
            )
            .unwrap();
            engine.solve()
        })
    });
}

fn bench_edge_index_build(c: &mut Criterion) {
    let puzzle = grid_puzzle(6, 6);
    c.bench_function("edge_index_build_6x6", |b| {
        b.iter(|| EdgeIndex::build(black_box(&puzzle.pieces)))
    });
}

criterion_group!(
    benches,
    bench_solve_4x4,
    bench_solve_without_singletons,
    bench_edge_index_build
);
criterion_main!(benches);
