//! Eterniton edge-matching puzzle solver CLI.
//!
//! Loads a puzzle definition from a JSON file, runs the engine
//! sequentially or in parallel, and reports the outcome. Recognized
//! options mirror spec §6's CLI surface; exit codes follow the same
//! table (0 solved, 1 timed out or exhausted without a solution, 2
//! failed with an error, 130 cancelled).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use eterniton::config::{ParallelStrategy, SolverConfig, SortOrder, ThreadCount};
use eterniton::engine::{Engine, SaveTarget, SolveOutcome, Statistics};
use eterniton::piece::Piece;
use eterniton::puzzle::{FixedPlacement, Puzzle};
use eterniton::save::{SaveStore, SnapshotFormat};
use eterniton::shared::{CancelToken, SharedState};
use eterniton::{parallel, piece};

/// Solves an edge-matching puzzle described by a JSON file.
#[derive(Parser)]
#[command(name = "eterniton")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a puzzle definition (see `PuzzleFile` for the JSON shape).
    puzzle_file: PathBuf,

    /// Emit step-by-step trace records.
    #[arg(long)]
    verbose: bool,

    /// Use the parallel coordinator instead of one sequential engine.
    #[arg(long)]
    parallel: bool,

    /// Parallel strategy, only consulted when `--parallel` is set.
    #[arg(long, value_enum, default_value = "diversified")]
    strategy: StrategyArg,

    /// Worker thread count; -1 selects an automatic count.
    #[arg(long, default_value_t = -1)]
    threads: i64,

    /// Wall-clock deadline in seconds; unset means no deadline.
    #[arg(long)]
    timeout_seconds: Option<u64>,

    /// Disable the forced-move (singleton) detector.
    #[arg(long)]
    no_singletons: bool,

    /// LCV candidate ordering direction.
    #[arg(long, default_value = "ascending")]
    sort_order: SortOrder,

    /// Rank border cells above interior cells during MRV selection.
    #[arg(long)]
    prioritize_borders: bool,

    /// Throttle verbose trace records to placements at or past this depth.
    #[arg(long, default_value_t = 0)]
    min_depth_to_show: usize,

    /// Root directory for snapshots; defaults to `SOLVER_SAVE_ROOT` or "saves".
    #[arg(long)]
    save_root: Option<PathBuf>,

    /// Snapshot grouping used for the saves directory layout.
    #[arg(long, default_value = "default")]
    puzzle_class: String,

    /// Snapshot identity within `puzzle_class`; defaults to the file stem.
    #[arg(long)]
    config_id: Option<String>,

    /// Resume from the newest saved snapshot for this class/configId, if any.
    #[arg(long)]
    resume: bool,

    /// Disable snapshot writes entirely.
    #[arg(long)]
    no_save: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum StrategyArg {
    Diversified,
    WorkStealing,
}

/// The JSON shape a puzzle file is expected to follow. Loader format is
/// out of scope for the engine itself (spec §6); this is the
/// demonstration binary's own schema, not a contract the library enforces.
#[derive(Debug, Deserialize)]
struct PuzzleFile {
    rows: usize,
    cols: usize,
    pieces: Vec<PieceFile>,
    #[serde(default)]
    fixed_placements: Vec<FixedPlacementFile>,
}

#[derive(Debug, Deserialize)]
struct PieceFile {
    id: u32,
    edges: [piece::Label; 4],
}

#[derive(Debug, Deserialize)]
struct FixedPlacementFile {
    row: usize,
    col: usize,
    piece_id: u32,
    #[serde(default)]
    rotation: u8,
}

/// Loads the puzzle definition from `path` and applies the CLI's
/// `--sort-order`/`--prioritize-borders` flags onto it — spec §3 defines
/// both as fields of `Puzzle` itself, not of the engine's run-time
/// config, so that is where a front end must set them.
fn load_puzzle(path: &std::path::Path, cli: &Cli) -> anyhow::Result<Puzzle> {
    let bytes = std::fs::read(path)?;
    let file: PuzzleFile = serde_json::from_slice(&bytes)?;

    let pieces = file.pieces.into_iter().map(|p| Piece::new(p.id, p.edges)).collect();
    let fixed = file
        .fixed_placements
        .into_iter()
        .map(|f| FixedPlacement {
            row: f.row,
            col: f.col,
            piece_id: f.piece_id,
            rotation: f.rotation,
        })
        .collect();

    Ok(Puzzle::new(file.rows, file.cols, pieces)
        .with_fixed_placements(fixed)
        .with_sort_order(cli.sort_order)
        .with_prioritize_borders(cli.prioritize_borders))
}

fn build_config(cli: &Cli) -> SolverConfig {
    let mut config = SolverConfig::default();
    config.verbose = cli.verbose;
    config.parallel = cli.parallel;
    config.parallel_strategy = match cli.strategy {
        StrategyArg::Diversified => ParallelStrategy::DiversifiedFixedPool,
        StrategyArg::WorkStealing => ParallelStrategy::WorkStealing,
    };
    config.threads = ThreadCount::from(cli.threads);
    config.timeout = cli.timeout_seconds.map(Duration::from_secs);
    config.use_singletons = !cli.no_singletons;
    config.min_depth_to_show = cli.min_depth_to_show;
    if let Some(root) = &cli.save_root {
        config.save_root = root.clone();
    }
    config
}

fn config_id(cli: &Cli) -> String {
    cli.config_id.clone().unwrap_or_else(|| {
        cli.puzzle_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "puzzle".to_string())
    })
}

fn print_stats(stats: &Statistics) {
    println!(
        "recursive_calls={} placements_tried={} backtracks={} dead_ends={} singletons_placed={}",
        stats.recursive_calls, stats.placements_tried, stats.backtracks, stats.dead_ends, stats.singletons_placed
    );
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let puzzle = match load_puzzle(&cli.puzzle_file, &cli) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("failed to load puzzle file: {e}");
            return ExitCode::from(2);
        }
    };

    let config = build_config(&cli);
    let config_id = config_id(&cli);

    let save = if cli.no_save {
        None
    } else {
        Some(SaveTarget {
            store: Arc::new(SaveStore::new(config.save_root.clone(), SnapshotFormat::Binary)),
            puzzle_class: cli.puzzle_class.clone(),
            config_id: config_id.clone(),
        })
    };

    let outcome = if config.parallel {
        match parallel::solve(puzzle, config, save) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("invalid puzzle: {e}");
                return ExitCode::from(2);
            }
        }
    } else {
        let shared = Arc::new(SharedState::new());
        let cancel = CancelToken::new(shared);

        let resumed = if cli.resume {
            save.as_ref().and_then(|target| match target.store.resume(&cli.puzzle_class, &config_id) {
                Ok(snap) => snap,
                Err(e) => {
                    log::warn!("resume failed, starting fresh: {e}");
                    None
                }
            })
        } else {
            None
        };

        let built = match resumed {
            Some(snapshot) => Engine::resume(puzzle, config, cancel, save, snapshot),
            None => Engine::new(puzzle, config, cancel, save).map(|e| (e, Vec::new())),
        };

        match built {
            Ok((mut engine, resumed_order)) => engine.solve_from(&resumed_order),
            Err(e) => {
                eprintln!("invalid puzzle: {e}");
                return ExitCode::from(2);
            }
        }
    };

    match outcome {
        SolveOutcome::Solved(board, stats) => {
            println!("solved");
            for (r, c) in board.iter_cells() {
                if let Some(p) = board.get(r, c) {
                    println!("{r},{c} piece={} rotation={}", p.piece_id, p.rotation);
                }
            }
            print_stats(&stats);
            ExitCode::from(0)
        }
        SolveOutcome::ExhaustedNoSolution(stats) => {
            println!("no solution exists");
            print_stats(&stats);
            ExitCode::from(1)
        }
        SolveOutcome::TimedOut(stats) => {
            println!("timed out before a solution was found");
            print_stats(&stats);
            ExitCode::from(1)
        }
        SolveOutcome::Cancelled(stats) => {
            println!("cancelled");
            print_stats(&stats);
            ExitCode::from(130)
        }
    }
}
