//! Two parallel search strategies over one puzzle (spec §4.10):
//! a diversified fixed pool of whole-puzzle engines, and a work-stealing
//! fork/join that recursively splits branching cells' candidates across
//! a `crossbeam_deque` queue down to a fixed depth, handing each
//! resulting subtree to a sequential engine.
//!
//! Grounded on `SH11235-rshogi`'s `search/parallel/work_queue.rs`
//! (`Injector`/`Worker`/`Stealer`, local-pop-then-steal dispatch) and
//! `search/parallel/thread_pool.rs` (graceful shutdown, per-worker
//! panic isolation). That engine steals randomly among peer workers
//! using the `rand` crate; this one is not in the dependency stack
//! here, so stealing falls back to a deterministic round-robin peer
//! order, documented in DESIGN.md.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_deque::{Injector, Steal, Stealer, Worker as DequeWorker};

use crate::board::Board;
use crate::config::{ParallelStrategy, SolverConfig};
use crate::domain::DomainStore;
use crate::edge_index::EdgeIndex;
use crate::engine::{Engine, SaveTarget, SolveOutcome, Statistics};
use crate::error::PuzzleError;
use crate::heuristics::{piece_difficulty, LcvOrderer, MrvSelector, ValueOrderer, VariableSelector};
use crate::puzzle::{FixedPlacement, PieceSet, Puzzle};
use crate::shared::{CancelToken, SharedState};

/// Recursion-depth threshold `T` from spec §4.10: a task at fork depth
/// at most this value forks one child per candidate at its next
/// branching cell; past it, a task is handed to a sequential [`Engine`]
/// instead of forking further.
const FORK_THRESHOLD: usize = 4;
/// A root branch with only one candidate gains nothing from the
/// thread/queue setup over a single sequential engine.
const MIN_ROOT_CANDIDATES_TO_FORK: usize = 2;
const JOIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Validates `puzzle` once, then dispatches to the configured strategy.
pub fn solve(puzzle: Puzzle, config: SolverConfig, save: Option<SaveTarget>) -> Result<SolveOutcome, PuzzleError> {
    puzzle.validate()?;
    let shared = Arc::new(SharedState::new());
    Ok(match config.parallel_strategy {
        ParallelStrategy::DiversifiedFixedPool => solve_diversified_fixed_pool(puzzle, config, shared, save),
        ParallelStrategy::WorkStealing => solve_work_stealing(puzzle, config, shared, save),
    })
}

fn diversify(puzzle: &Puzzle, worker_index: usize) -> Puzzle {
    let mut p = puzzle.clone();
    if worker_index % 2 == 1 {
        p.sort_order = match p.sort_order {
            crate::config::SortOrder::Ascending => crate::config::SortOrder::Descending,
            crate::config::SortOrder::Descending => crate::config::SortOrder::Ascending,
        };
    }
    if worker_index % 4 >= 2 {
        p.prioritize_borders = !p.prioritize_borders;
    }
    p
}

enum WorkerOutcome {
    Done(SolveOutcome),
    Panicked,
}

/// One independent [`Engine`] per thread, each over a heuristically
/// diversified copy of `puzzle`, racing to the same shared solution flag
/// (spec §4.10 "diversified fixed pool").
fn solve_diversified_fixed_pool(
    puzzle: Puzzle,
    config: SolverConfig,
    shared: Arc<SharedState>,
    save: Option<SaveTarget>,
) -> SolveOutcome {
    let n = config.threads.resolve();
    let outcomes: std::sync::Mutex<Vec<WorkerOutcome>> = std::sync::Mutex::new(Vec::new());

    thread::scope(|scope| {
        for i in 0..n {
            let puzzle_i = diversify(&puzzle, i);
            let config_i = config.clone();
            let cancel = CancelToken::new(shared.clone());
            let save_i = save.as_ref().map(|t| t.clone_for_worker(i));
            let outcomes = &outcomes;

            scope.spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut engine = Engine::new(puzzle_i, config_i, cancel.clone(), save_i)
                        .expect("diversified puzzle copy must validate identically to the original");
                    engine.solve()
                }));

                let outcome = match result {
                    Ok(outcome) => {
                        if let SolveOutcome::Solved(..) = &outcome {
                            shared.mark_solution_found();
                        }
                        WorkerOutcome::Done(outcome)
                    }
                    Err(panic_info) => {
                        log::error!("diversified worker {i} panicked: {}", describe_panic(&panic_info));
                        WorkerOutcome::Panicked
                    }
                };
                outcomes.lock().unwrap().push(outcome);
            });
        }
    });

    reduce_outcomes(outcomes.into_inner().unwrap())
}

fn describe_panic(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

fn reduce_outcomes(outcomes: Vec<WorkerOutcome>) -> SolveOutcome {
    let mut any_panicked = false;
    let mut any_timed_out = None;
    let mut any_cancelled = None;
    let mut all_exhausted_stats = Statistics::default();
    let mut all_exhausted = true;

    for outcome in outcomes {
        match outcome {
            WorkerOutcome::Done(SolveOutcome::Solved(board, stats)) => {
                return SolveOutcome::Solved(board, stats);
            }
            WorkerOutcome::Done(SolveOutcome::TimedOut(stats)) => {
                any_timed_out = Some(stats);
                all_exhausted = false;
            }
            WorkerOutcome::Done(SolveOutcome::Cancelled(stats)) => {
                any_cancelled = Some(stats);
                all_exhausted = false;
            }
            WorkerOutcome::Done(SolveOutcome::ExhaustedNoSolution(stats)) => {
                sum_into(&mut all_exhausted_stats, &stats);
            }
            WorkerOutcome::Panicked => {
                any_panicked = true;
                all_exhausted = false;
            }
        }
    }

    if all_exhausted {
        return SolveOutcome::ExhaustedNoSolution(all_exhausted_stats);
    }
    if let Some(stats) = any_timed_out {
        return SolveOutcome::TimedOut(stats);
    }
    if any_panicked {
        log::error!("at least one worker panicked without any worker solving; reporting Cancelled rather than asserting no solution exists");
    }
    SolveOutcome::Cancelled(any_cancelled.unwrap_or_default())
}

fn sum_into(total: &mut Statistics, other: &Statistics) {
    total.recursive_calls += other.recursive_calls;
    total.placements_tried += other.placements_tried;
    total.backtracks += other.backtracks;
    total.fit_checks += other.fit_checks;
    total.forward_check_rejects += other.forward_check_rejects;
    total.singletons_found += other.singletons_found;
    total.singletons_placed += other.singletons_placed;
    total.dead_ends += other.dead_ends;
}

enum BranchPlan {
    Immediate(SolveOutcome),
    Branch { cell: (usize, usize), candidates: Vec<(u32, u8)> },
}

/// One unit of work in the recursive fork tree: `puzzle` carries every
/// cell pinned by an ancestor fork as an extra fixed placement, and
/// `fork_depth` counts how many forks produced it (0 at the root).
struct ForkTask {
    puzzle: Puzzle,
    fork_depth: usize,
}

/// Applies `puzzle`'s fixed placements (including any pinned by an
/// ancestor fork), builds the domain store, and picks the MRV cell +
/// LCV-ordered candidates at whatever cell branches next — the same
/// step [`Engine::solve`] takes at its current node, surfaced here so a
/// work-stealing worker can either fork it again or hand it to a
/// sequential engine (spec §4.10).
fn initial_branch(puzzle: &Puzzle) -> BranchPlan {
    let pieces = PieceSet::from_pieces(&puzzle.pieces);
    let edge_index = EdgeIndex::build(&puzzle.pieces);

    let mut board = Board::new(puzzle.rows, puzzle.cols);
    let mut used = Vec::new();
    for fp in &puzzle.fixed_placements {
        if let Some(piece) = pieces.get(fp.piece_id) {
            board.place(fp.row, fp.col, crate::piece::Placement::new(piece, fp.rotation));
            used.push(fp.piece_id);
        }
    }

    if board.iter_cells().all(|(r, c)| !board.is_empty(r, c)) {
        return BranchPlan::Immediate(SolveOutcome::Solved(board, Statistics::default()));
    }

    let store = DomainStore::init(&board, &pieces, &edge_index, &used);
    let selector = MrvSelector;
    let Some(cell) = selector.select(&board, &store, puzzle.prioritize_borders) else {
        return BranchPlan::Immediate(SolveOutcome::ExhaustedNoSolution(Statistics::default()));
    };

    if store.cell_piece_count(cell.0, cell.1) == 0 {
        return BranchPlan::Immediate(SolveOutcome::ExhaustedNoSolution(Statistics::default()));
    }

    let difficulty = piece_difficulty(&pieces, &edge_index);
    let orderer = LcvOrderer { difficulty };
    let candidates = orderer.order(cell, &store, puzzle.sort_order);

    BranchPlan::Branch { cell, candidates }
}

/// One forked candidate: the original puzzle plus the branching cell's
/// choice pinned as an extra fixed placement, so a worker can hand it
/// straight to a normal sequential [`Engine`].
fn puzzle_with_candidate(puzzle: &Puzzle, cell: (usize, usize), piece_id: u32, rotation: u8) -> Puzzle {
    let mut fixed = puzzle.fixed_placements.clone();
    fixed.push(FixedPlacement {
        row: cell.0,
        col: cell.1,
        piece_id,
        rotation,
    });
    puzzle.clone().with_fixed_placements(fixed)
}

/// Recursive depth-bounded fork/join (spec §4.10): the root task starts
/// at fork depth 0 on a [`crossbeam_deque::Injector`]; whenever a worker
/// pops a task at depth ≤ [`FORK_THRESHOLD`], it re-derives that task's
/// next branching cell and pushes one child task per LCV-ordered
/// candidate (fork depth + 1) onto its own local queue instead of
/// solving anything itself. Only a task past the threshold — or one
/// whose branch is already decided — is handed to a sequential
/// [`Engine`]. A single root candidate gains nothing from any of this
/// over one sequential engine, so that case skips the queue entirely.
fn solve_work_stealing(
    puzzle: Puzzle,
    config: SolverConfig,
    shared: Arc<SharedState>,
    save: Option<SaveTarget>,
) -> SolveOutcome {
    let plan = initial_branch(&puzzle);
    let candidate_count = match &plan {
        BranchPlan::Immediate(_) => 0,
        BranchPlan::Branch { candidates, .. } => candidates.len(),
    };
    if candidate_count < MIN_ROOT_CANDIDATES_TO_FORK {
        let cancel = CancelToken::new(shared);
        let mut engine = Engine::new(puzzle, config, cancel, save)
            .expect("puzzle already validated by initial_branch's caller");
        return engine.solve();
    }

    let injector: Arc<Injector<ForkTask>> = Arc::new(Injector::new());
    injector.push(ForkTask { puzzle, fork_depth: 0 });
    // The root task counts as the one outstanding unit of work; forking
    // it grows this by (children - 1), and every leaf decrements it by
    // one on completion, so counting down to zero is a sound stopping
    // condition — unlike counting idle/active workers, it can't deadlock
    // on the last worker still holding itself "active" while it checks
    // for more work.
    let remaining_jobs = Arc::new(AtomicUsize::new(1));

    let n = config.threads.resolve();
    let workers: Vec<DequeWorker<ForkTask>> = (0..n).map(|_| DequeWorker::new_lifo()).collect();
    let stealers: Arc<Vec<Stealer<ForkTask>>> = Arc::new(workers.iter().map(DequeWorker::stealer).collect());

    let outcomes: std::sync::Mutex<Vec<WorkerOutcome>> = std::sync::Mutex::new(Vec::new());
    let join_start = Instant::now();

    thread::scope(|scope| {
        for (worker_id, local) in workers.into_iter().enumerate() {
            let injector = injector.clone();
            let stealers = stealers.clone();
            let remaining_jobs = remaining_jobs.clone();
            let shared = shared.clone();
            let config = config.clone();
            let save = save.as_ref().map(|t| t.clone_for_worker(worker_id));
            let outcomes = &outcomes;

            scope.spawn(move || {
                loop {
                    if shared.is_cancelled() || shared.is_solution_found() {
                        break;
                    }

                    let Some(task) = next_job(&local, &injector, &stealers, worker_id) else {
                        if remaining_jobs.load(Ordering::SeqCst) == 0 {
                            break;
                        }
                        thread::yield_now();
                        continue;
                    };

                    let result = panic::catch_unwind(AssertUnwindSafe(|| initial_branch(&task.puzzle)));
                    let plan = match result {
                        Ok(plan) => plan,
                        Err(panic_info) => {
                            log::error!(
                                "work-stealing worker {worker_id} panicked selecting a branch: {}",
                                describe_panic(&panic_info)
                            );
                            remaining_jobs.fetch_sub(1, Ordering::SeqCst);
                            outcomes.lock().unwrap().push(WorkerOutcome::Panicked);
                            continue;
                        }
                    };

                    match plan {
                        BranchPlan::Immediate(outcome) => {
                            remaining_jobs.fetch_sub(1, Ordering::SeqCst);
                            if let SolveOutcome::Solved(..) = &outcome {
                                shared.mark_solution_found();
                            }
                            outcomes.lock().unwrap().push(WorkerOutcome::Done(outcome));
                        }
                        BranchPlan::Branch { cell, candidates } if task.fork_depth <= FORK_THRESHOLD => {
                            let children: Vec<ForkTask> = candidates
                                .into_iter()
                                .map(|(piece_id, rotation)| ForkTask {
                                    puzzle: puzzle_with_candidate(&task.puzzle, cell, piece_id, rotation),
                                    fork_depth: task.fork_depth + 1,
                                })
                                .collect();
                            remaining_jobs.fetch_add(children.len(), Ordering::SeqCst);
                            for child in children {
                                local.push(child);
                            }
                            remaining_jobs.fetch_sub(1, Ordering::SeqCst);
                        }
                        BranchPlan::Branch { .. } => {
                            let cancel = CancelToken::new(shared.clone());
                            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                                let mut engine = Engine::new(task.puzzle, config.clone(), cancel, save.clone())
                                    .expect("forked puzzle is a superset of an already-validated puzzle");
                                engine.solve()
                            }));
                            remaining_jobs.fetch_sub(1, Ordering::SeqCst);

                            match result {
                                Ok(outcome) => {
                                    if let SolveOutcome::Solved(..) = &outcome {
                                        shared.mark_solution_found();
                                    }
                                    outcomes.lock().unwrap().push(WorkerOutcome::Done(outcome));
                                }
                                Err(panic_info) => {
                                    log::error!(
                                        "work-stealing worker {worker_id} panicked on one work item: {}",
                                        describe_panic(&panic_info)
                                    );
                                    outcomes.lock().unwrap().push(WorkerOutcome::Panicked);
                                }
                            }
                        }
                    }
                }
            });
        }
    });

    if join_start.elapsed() > JOIN_TIMEOUT {
        log::warn!(
            "work-stealing pool took {:?} to drain, past the {:?} graceful-shutdown budget",
            join_start.elapsed(),
            JOIN_TIMEOUT
        );
    }

    reduce_outcomes(outcomes.into_inner().unwrap())
}

/// Local LIFO pop, then round-robin peer steal, then the shared
/// injector (spec §4.10; see module docs on the `rand`-free
/// simplification versus the teacher's randomized peer order).
fn next_job(
    local: &DequeWorker<ForkTask>,
    injector: &Injector<ForkTask>,
    stealers: &[Stealer<ForkTask>],
    worker_id: usize,
) -> Option<ForkTask> {
    if let Some(item) = local.pop() {
        return Some(item);
    }

    for offset in 1..stealers.len() {
        let idx = (worker_id + offset) % stealers.len();
        if let Steal::Success(item) = stealers[idx].steal() {
            return Some(item);
        }
    }

    loop {
        match injector.steal_batch_and_pop(local) {
            Steal::Success(item) => return Some(item),
            Steal::Empty => return None,
            Steal::Retry => continue,
        }
    }
}

impl SaveTarget {
    fn clone_for_worker(&self, worker_index: usize) -> SaveTarget {
        SaveTarget {
            store: self.store.clone(),
            puzzle_class: self.puzzle_class.clone(),
            config_id: format!("{}-w{}", self.config_id, worker_index),
        }
    }
}
