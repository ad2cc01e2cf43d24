//! Backtracking driver (spec §4.8): orchestrates `Board`, `DomainStore`,
//! `EdgeIndex`, the heuristics, the singleton detector, and the
//! symmetry breaker into one sequential search.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

use crate::board::Board;
use crate::clock::Clock;
use crate::config::SolverConfig;
use crate::domain::{Cell, DomainStore};
use crate::edge_index::EdgeIndex;
use crate::error::PuzzleError;
use crate::heuristics::{piece_difficulty, LcvOrderer, MrvSelector, ValueOrderer, VariableSelector};
use crate::piece::Placement;
use crate::propagate::propagate;
use crate::puzzle::{FixedPlacement, PieceSet, Puzzle};
use crate::save::{SaveStore, Snapshot, SnapshotPlacement};
use crate::shared::CancelToken;
use crate::singleton::find_singleton;
use crate::symmetry::SymmetryBreaker;

const SAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Counters accumulated over one engine run (spec §3 "Statistics").
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub recursive_calls: u64,
    pub placements_tried: u64,
    pub backtracks: u64,
    pub fit_checks: u64,
    pub forward_check_rejects: u64,
    pub singletons_found: u64,
    pub singletons_placed: u64,
    pub dead_ends: u64,
}

/// The top-level return value of a solve (SPEC_FULL.md §3), giving a
/// caller the distinction spec.md §6 maps to exit codes 0/1/1/130
/// without this crate depending on `std::process::exit` itself.
#[derive(Debug)]
pub enum SolveOutcome {
    Solved(Board, Statistics),
    ExhaustedNoSolution(Statistics),
    TimedOut(Statistics),
    Cancelled(Statistics),
}

/// A chronologically-ordered record of every piece placed during the
/// current (resumed) search (spec §3 "PlacementOrder").
#[derive(Debug, Clone, Copy)]
struct OrderedPlacement {
    cell: Cell,
    placement: Placement,
}

struct SearchState {
    board: Board,
    store: DomainStore,
    placement_order: Vec<OrderedPlacement>,
    used: FxHashSet<u32>,
    top_left_piece_id: Option<u32>,
    stats: Statistics,
    best_depth_ever: usize,
    last_save: Instant,
}

enum StepResult {
    Solved,
    Failed,
    Terminated,
}

/// Where to persist snapshots for one run, if at all.
pub struct SaveTarget {
    pub store: Arc<SaveStore>,
    pub puzzle_class: String,
    pub config_id: String,
}

pub struct Engine {
    puzzle: Puzzle,
    pieces: PieceSet,
    edge_index: EdgeIndex,
    symmetry: SymmetryBreaker,
    selector: MrvSelector,
    orderer: LcvOrderer,
    config: SolverConfig,
    cancel: CancelToken,
    save: Option<SaveTarget>,
    clock: Clock,
}

impl Engine {
    /// Validates the puzzle, builds `EdgeIndex`/difficulty scores, and
    /// returns an engine ready to `solve()` (spec §4.8 steps 1–3).
    pub fn new(
        puzzle: Puzzle,
        config: SolverConfig,
        cancel: CancelToken,
        save: Option<SaveTarget>,
    ) -> Result<Self, PuzzleError> {
        puzzle.validate()?;

        let pieces = PieceSet::from_pieces(&puzzle.pieces);
        let edge_index = EdgeIndex::build(&puzzle.pieces);
        let difficulty = piece_difficulty(&pieces, &edge_index);
        let symmetry = SymmetryBreaker::default();

        log::info!(
            "engine starting: {}x{} grid, {} pieces, {} fixed",
            puzzle.rows,
            puzzle.cols,
            puzzle.pieces.len(),
            puzzle.fixed_placements.len()
        );

        Ok(Self {
            puzzle,
            pieces,
            edge_index,
            symmetry,
            selector: MrvSelector,
            orderer: LcvOrderer { difficulty },
            clock: Clock::start().with_deadline(config.timeout),
            config,
            cancel,
            save,
        })
    }

    /// Resumes from a previously written snapshot, restoring
    /// `previousTimeOffset` and replaying `placementOrder` (spec §4.11
    /// "Resume").
    pub fn resume(
        puzzle: Puzzle,
        config: SolverConfig,
        cancel: CancelToken,
        save: Option<SaveTarget>,
        snapshot: Snapshot,
    ) -> Result<(Self, Vec<SnapshotPlacement>), PuzzleError> {
        let timeout = config.timeout;
        let mut engine = Self::new(puzzle, config, cancel, save)?;
        engine.clock = Clock::resume(Duration::from_millis(snapshot.cumulative_time_ms)).with_deadline(timeout);
        log::info!(
            "resumed engine for puzzle {}: recovered {}ms of prior compute time, {} placements replayed",
            snapshot.puzzle_id,
            snapshot.cumulative_time_ms,
            snapshot.placement_order.len()
        );
        Ok((engine, snapshot.placement_order))
    }

    fn fixed_placements_applied(&self, board: &mut Board) -> FxHashSet<u32> {
        let mut used = FxHashSet::default();
        for fp in &self.puzzle.fixed_placements {
            if let Some(piece) = self.pieces.get(fp.piece_id) {
                board.place(fp.row, fp.col, Placement::new(piece, fp.rotation));
                used.insert(fp.piece_id);
            }
        }
        used
    }

    /// Runs the backtracking search to completion, a deadline, or
    /// cancellation (spec §4.8 step 4 `search()`).
    pub fn solve(&mut self) -> SolveOutcome {
        self.solve_from(&[])
    }

    /// Like [`Engine::solve`], but replays `resumed_order` onto the
    /// board before branching resumes.
    pub fn solve_from(&mut self, resumed_order: &[SnapshotPlacement]) -> SolveOutcome {
        let mut board = Board::new(self.puzzle.rows, self.puzzle.cols);
        let mut used = self.fixed_placements_applied(&mut board);

        let mut store = DomainStore::init(&board, &self.pieces, &self.edge_index, &used.iter().copied().collect::<Vec<_>>());
        let mut placement_order = Vec::new();
        let mut top_left_piece_id = None;

        for p in resumed_order {
            let Some(piece) = self.pieces.get(p.piece_id) else {
                continue;
            };
            let placement = Placement::new(piece, p.rotation);
            board.place(p.row, p.col, placement);
            store.apply_placement(&board, &self.pieces, p.row, p.col, placement);
            if propagate(&mut store, &board, &self.pieces, (p.row, p.col)).is_err() {
                log::warn!("resumed placement at ({},{}) produced a wipeout on replay", p.row, p.col);
            }
            used.insert(p.piece_id);
            if (p.row, p.col) == (0, 0) {
                top_left_piece_id = Some(p.piece_id);
            }
            placement_order.push(OrderedPlacement {
                cell: (p.row, p.col),
                placement,
            });
        }

        let mut state = SearchState {
            board,
            store,
            placement_order,
            used,
            top_left_piece_id,
            stats: Statistics::default(),
            best_depth_ever: 0,
            last_save: Instant::now(),
        };

        let result = self.search(&mut state);

        let outcome = match result {
            StepResult::Solved => SolveOutcome::Solved(state.board.clone(), state.stats.clone()),
            StepResult::Failed => SolveOutcome::ExhaustedNoSolution(state.stats.clone()),
            StepResult::Terminated => {
                if self.clock.deadline_exceeded() {
                    SolveOutcome::TimedOut(state.stats.clone())
                } else {
                    SolveOutcome::Cancelled(state.stats.clone())
                }
            }
        };

        self.flush_final_save(&state);
        log::info!(
            "engine stopping: calls={} placements_tried={} backtracks={}",
            state.stats.recursive_calls,
            state.stats.placements_tried,
            state.stats.backtracks
        );
        outcome
    }

    fn search(&self, state: &mut SearchState) -> StepResult {
        state.stats.recursive_calls += 1;

        if self.cancel.is_triggered() || self.clock.deadline_exceeded() {
            return StepResult::Terminated;
        }

        if state.board.iter_cells().all(|(r, c)| !state.board.is_empty(r, c)) {
            return StepResult::Solved;
        }

        if self.config.use_singletons {
            if let Some(singleton) = find_singleton(&state.board, &state.store) {
                state.stats.singletons_found += 1;
                if !self.symmetry.accepts(
                    &state.board,
                    singleton.cell,
                    singleton.piece_id,
                    singleton.rotation,
                    state.top_left_piece_id,
                ) {
                    // the forced move violates symmetry breaking; no
                    // alternative exists, so this branch is dead
                    state.stats.dead_ends += 1;
                    return StepResult::Failed;
                }

                let Some(piece) = self.pieces.get(singleton.piece_id).copied() else {
                    return StepResult::Failed;
                };
                let (r, c) = singleton.cell;
                let placed = self.place(state, r, c, &piece, singleton.rotation);
                if !placed {
                    state.stats.dead_ends += 1;
                    return StepResult::Failed;
                }
                state.stats.singletons_placed += 1;
                log::debug!("forced placement: piece {} at ({},{})", singleton.piece_id, r, c);

                self.maybe_save(state);
                let result = self.search(state);
                if !matches!(result, StepResult::Solved | StepResult::Terminated) {
                    self.unplace(state);
                    state.stats.backtracks += 1;
                }
                return result;
            }
        }

        let Some(cell) = self.selector.select(&state.board, &state.store, self.puzzle.prioritize_borders) else {
            return StepResult::Failed;
        };

        if state.store.cell_piece_count(cell.0, cell.1) == 0 {
            return StepResult::Failed;
        }

        let candidates = self.orderer.order(cell, &state.store, self.puzzle.sort_order);

        for (piece_id, rotation) in candidates {
            if self.cancel.is_triggered() || self.clock.deadline_exceeded() {
                return StepResult::Terminated;
            }

            if !self
                .symmetry
                .accepts(&state.board, cell, piece_id, rotation, state.top_left_piece_id)
            {
                continue;
            }

            let Some(piece) = self.pieces.get(piece_id).copied() else {
                continue;
            };

            state.stats.fit_checks += 1;
            let placed = self.place(state, cell.0, cell.1, &piece, rotation);
            if !placed {
                state.stats.forward_check_rejects += 1;
                continue;
            }

            if self.config.verbose && state.placement_order.len() >= self.config.min_depth_to_show {
                log::trace!("placed piece {} rot {} at ({},{})", piece_id, rotation, cell.0, cell.1);
            }

            self.maybe_save(state);
            let result = self.search(state);
            match result {
                StepResult::Solved | StepResult::Terminated => return result,
                StepResult::Failed => {
                    self.unplace(state);
                    state.stats.backtracks += 1;
                }
            }
        }

        state.stats.dead_ends += 1;
        StepResult::Failed
    }

    /// Places `piece` at `(r,c)`, propagates, and returns `true` on
    /// success. On a wipeout it fully undoes its own side effects and
    /// returns `false` (no recursion happens for a rejected candidate).
    fn place(
        &self,
        state: &mut SearchState,
        r: usize,
        c: usize,
        piece: &crate::piece::Piece,
        rotation: u8,
    ) -> bool {
        let placement = Placement::new(piece, rotation);
        state.board.place(r, c, placement);
        state.store.apply_placement(&state.board, &self.pieces, r, c, placement);

        if propagate(&mut state.store, &state.board, &self.pieces, (r, c)).is_err() {
            state.store.undo();
            state.board.remove(r, c);
            return false;
        }

        state.used.insert(piece.id);
        if (r, c) == (0, 0) {
            state.top_left_piece_id = Some(piece.id);
        }
        state.placement_order.push(OrderedPlacement {
            cell: (r, c),
            placement,
        });
        state.stats.placements_tried += 1;

        let depth = state.placement_order.len();
        if depth > state.best_depth_ever {
            state.best_depth_ever = depth;
        }
        true
    }

    fn unplace(&self, state: &mut SearchState) {
        let ordered = state.placement_order.pop().expect("unplace without a matching place");
        state.used.remove(&ordered.placement.piece_id);
        if ordered.cell == (0, 0) {
            state.top_left_piece_id = None;
        }
        state.store.undo();
        state.board.remove(ordered.cell.0, ordered.cell.1);
    }

    fn maybe_save(&self, state: &mut SearchState) {
        self.cancel.shared().observe_depth(state.placement_order.len() as u32);

        let Some(target) = &self.save else {
            return;
        };

        let depth = state.placement_order.len();
        if depth > 0 && depth == state.best_depth_ever {
            let snap = self.snapshot(state);
            if let Err(e) = target.store.write_milestone(&target.puzzle_class, &target.config_id, &snap) {
                log::warn!("failed to write milestone snapshot: {e}");
            } else {
                log::info!("wrote milestone snapshot at depth {depth}");
            }
        }

        if state.last_save.elapsed() >= SAVE_INTERVAL {
            let snap = self.snapshot(state);
            if let Err(e) = target.store.write_current(&target.puzzle_class, &target.config_id, &snap) {
                log::warn!("failed to write current snapshot: {e}");
            }
            state.last_save = Instant::now();
        }
    }

    fn flush_final_save(&self, state: &SearchState) {
        let Some(target) = &self.save else {
            return;
        };
        let snap = self.snapshot(state);
        if let Err(e) = target.store.write_current(&target.puzzle_class, &target.config_id, &snap) {
            log::warn!("failed to flush final snapshot: {e}");
        }
    }

    fn snapshot(&self, state: &SearchState) -> Snapshot {
        let mut placements: Vec<SnapshotPlacement> = Vec::new();
        for (r, c) in state.board.iter_cells() {
            if let Some(p) = state.board.get(r, c) {
                placements.push(SnapshotPlacement {
                    row: r,
                    col: c,
                    piece_id: p.piece_id,
                    rotation: p.rotation,
                });
            }
        }

        let placement_order = state
            .placement_order
            .iter()
            .map(|op| SnapshotPlacement {
                row: op.cell.0,
                col: op.cell.1,
                piece_id: op.placement.piece_id,
                rotation: op.placement.rotation,
            })
            .collect();

        let unused_piece_ids: Vec<u32> = self
            .pieces
            .ids()
            .filter(|id| !state.used.contains(id))
            .collect();

        Snapshot {
            puzzle_id: self
                .save
                .as_ref()
                .map(|t| t.config_id.clone())
                .unwrap_or_default(),
            rows: self.puzzle.rows,
            cols: self.puzzle.cols,
            timestamp: unix_timestamp(),
            cumulative_time_ms: self.clock.cumulative().as_millis() as u64,
            depth: state.placement_order.len(),
            placements,
            placement_order,
            unused_piece_ids,
            fixed_placements: self.puzzle.fixed_placements.clone(),
        }
    }
}

fn unix_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Piece;
    use crate::shared::SharedState;

    fn cancel_token() -> CancelToken {
        CancelToken::new(Arc::new(SharedState::new()))
    }

    #[test]
    fn trivial_1x1_solves_in_one_placement() {
        // S1: one piece [0,0,0,0]
        let puzzle = Puzzle::new(1, 1, vec![Piece::new(1, [0, 0, 0, 0])]);
        let mut engine = Engine::new(puzzle, SolverConfig::default(), cancel_token(), None).unwrap();
        match engine.solve() {
            SolveOutcome::Solved(board, stats) => {
                assert_eq!(board.get(0, 0).unwrap().piece_id, 1);
                assert_eq!(stats.placements_tried, 1);
            }
            other => panic!("expected Solved, got {other:?}"),
        }
    }

    #[test]
    fn impossible_1x1_reports_no_solution() {
        // S2: one piece [1,1,1,1] can never expose 0 on any boundary side
        let puzzle = Puzzle::new(1, 1, vec![Piece::new(1, [1, 1, 1, 1])]);
        let mut engine = Engine::new(puzzle, SolverConfig::default(), cancel_token(), None).unwrap();
        match engine.solve() {
            SolveOutcome::ExhaustedNoSolution(_) => {}
            other => panic!("expected ExhaustedNoSolution, got {other:?}"),
        }
    }

    #[test]
    fn two_by_two_solvable_instance_solves() {
        // S3
        let a = 11;
        let b = 12;
        let c = 13;
        let d = 14;
        let pieces = vec![
            Piece::new(1, [0, a, b, 0]),  // TL
            Piece::new(2, [0, 0, c, a]),  // TR
            Piece::new(3, [b, d, 0, 0]),  // BL
            Piece::new(4, [c, 0, 0, d]),  // BR
        ];
        let puzzle = Puzzle::new(2, 2, pieces);
        let mut engine = Engine::new(puzzle, SolverConfig::default(), cancel_token(), None).unwrap();
        match engine.solve() {
            SolveOutcome::Solved(board, _) => {
                let tl = board.get(0, 0).unwrap();
                assert_eq!(tl.rotation, 0);
                // boundary + neighbor-edge validity
                for (r, c) in board.iter_cells() {
                    let p = board.get(r, c).unwrap();
                    for side in crate::piece::SIDES {
                        if board.is_boundary_side(r, c, side) {
                            assert_eq!(p.edge_on(side), 0);
                        } else if let Some((nr, nc)) = board.neighbor(r, c, side) {
                            let np = board.get(nr, nc).unwrap();
                            assert_eq!(p.edge_on(side), np.edge_on(side.opposite()));
                        }
                    }
                }
            }
            other => panic!("expected Solved, got {other:?}"),
        }
    }

    #[test]
    fn no_repeated_piece_ids_in_a_solution() {
        let a = 11;
        let b = 12;
        let c = 13;
        let d = 14;
        let pieces = vec![
            Piece::new(1, [0, a, b, 0]),
            Piece::new(2, [0, 0, c, a]),
            Piece::new(3, [b, d, 0, 0]),
            Piece::new(4, [c, 0, 0, d]),
        ];
        let puzzle = Puzzle::new(2, 2, pieces);
        let mut engine = Engine::new(puzzle, SolverConfig::default(), cancel_token(), None).unwrap();
        if let SolveOutcome::Solved(board, _) = engine.solve() {
            let mut seen = FxHashSet::default();
            for (r, c) in board.iter_cells() {
                let id = board.get(r, c).unwrap().piece_id;
                assert!(seen.insert(id), "piece {id} placed twice");
            }
        } else {
            panic!("expected a solution");
        }
    }

    #[test]
    fn fixed_placements_are_respected_and_excluded_from_search() {
        let puzzle = Puzzle::new(1, 2, vec![
            Piece::new(1, [0, 5, 0, 0]),
            Piece::new(2, [0, 0, 0, 5]),
        ])
        .with_fixed_placements(vec![FixedPlacement {
            row: 0,
            col: 0,
            piece_id: 1,
            rotation: 0,
        }]);
        let mut engine = Engine::new(puzzle, SolverConfig::default(), cancel_token(), None).unwrap();
        match engine.solve() {
            SolveOutcome::Solved(board, stats) => {
                assert_eq!(board.get(0, 0).unwrap().piece_id, 1);
                assert_eq!(board.get(0, 1).unwrap().piece_id, 2);
                // the fixed piece was never branched on
                assert_eq!(stats.placements_tried, 1);
            }
            other => panic!("expected Solved, got {other:?}"),
        }
    }
}
