//! Engine-facing configuration: the in-crate analogue of spec §6's CLI
//! option table. Plain data so any front end can build one without
//! going through `clap` (only the demonstration binary in `main.rs`
//! derives a `clap::Parser` around this).

use std::time::Duration;

/// LCV direction (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Try least-constraining candidates first (fail-slow).
    #[default]
    Ascending,
    /// Try most-constraining candidates first (fail-fast).
    Descending,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(SortOrder::Ascending),
            "descending" | "desc" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Worker thread count: `-1` on the CLI maps to `Auto` (spec §6 `threads=N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadCount {
    Auto,
    Fixed(usize),
}

impl ThreadCount {
    /// `max(4, 0.75 * hardware parallelism)` default (spec §5).
    pub fn resolve(self) -> usize {
        match self {
            ThreadCount::Fixed(n) => n.max(1),
            ThreadCount::Auto => {
                let hw = num_cpus::get();
                ((hw as f64) * 0.75).round().max(4.0) as usize
            }
        }
    }
}

impl From<i64> for ThreadCount {
    fn from(n: i64) -> Self {
        if n < 0 {
            ThreadCount::Auto
        } else {
            ThreadCount::Fixed(n as usize)
        }
    }
}

/// Parallel search strategy (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelStrategy {
    DiversifiedFixedPool,
    WorkStealing,
}

/// The full set of options spec §6 lists as "recognized from whatever
/// front-end drives" the engine.
///
/// `sortOrder` and `prioritizeBorders` are in spec §6's option table,
/// but spec §3 defines them as fields of `Puzzle` itself (they travel
/// with the puzzle value, not the engine's run-time knobs), so a front
/// end applies those two CLI flags directly onto the `Puzzle` it
/// builds (see `main.rs`'s `load_puzzle`) rather than storing a second,
/// unread copy here.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub verbose: bool,
    pub parallel: bool,
    pub parallel_strategy: ParallelStrategy,
    pub threads: ThreadCount,
    pub timeout: Option<Duration>,
    pub use_singletons: bool,
    pub min_depth_to_show: usize,
    /// Root directory for snapshots (spec §6 `SOLVER_SAVE_ROOT`).
    pub save_root: std::path::PathBuf,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            parallel: false,
            parallel_strategy: ParallelStrategy::DiversifiedFixedPool,
            threads: ThreadCount::Auto,
            timeout: None,
            use_singletons: true,
            min_depth_to_show: 0,
            save_root: std::path::PathBuf::from(
                std::env::var("SOLVER_SAVE_ROOT").unwrap_or_else(|_| "saves".to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_count_auto_is_at_least_four() {
        assert!(ThreadCount::Auto.resolve() >= 4);
    }

    #[test]
    fn thread_count_fixed_passes_through() {
        assert_eq!(ThreadCount::Fixed(2).resolve(), 2);
    }

    #[test]
    fn negative_one_maps_to_auto() {
        assert_eq!(ThreadCount::from(-1i64), ThreadCount::Auto);
        assert_eq!(ThreadCount::from(6i64), ThreadCount::Fixed(6));
    }

    #[test]
    fn sort_order_parses_case_insensitively() {
        assert_eq!("Ascending".parse::<SortOrder>(), Ok(SortOrder::Ascending));
        assert_eq!("DESCENDING".parse::<SortOrder>(), Ok(SortOrder::Descending));
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
