//! Error kinds for puzzle validation and snapshot I/O.
//!
//! `PuzzleError` is the one error kind that aborts a whole run (see
//! spec §7); everything else (wipeouts, deadlines, cancellation,
//! snapshot I/O) is handled locally by the engine and never reaches a
//! caller as an `Err`.

use thiserror::Error;

/// Fatal errors raised while constructing or validating a [`crate::puzzle::Puzzle`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PuzzleError {
    #[error("grid has no cells (rows={rows}, cols={cols})")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("duplicate piece id {0}")]
    DuplicatePieceId(u32),

    #[error("fixed placement at ({row},{col}) references unknown piece id {piece_id}")]
    UnknownFixedPiece {
        row: usize,
        col: usize,
        piece_id: u32,
    },

    #[error("fixed placement at ({row},{col}) is out of bounds for a {rows}x{cols} grid")]
    FixedPlacementOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("fixed placements conflict: piece {piece_id} is fixed at both ({r1},{c1}) and ({r2},{c2})")]
    ConflictingFixedPlacement {
        piece_id: u32,
        r1: usize,
        c1: usize,
        r2: usize,
        c2: usize,
    },

    #[error("two fixed placements both target cell ({row},{col})")]
    DuplicateFixedCell { row: usize, col: usize },
}

/// Non-fatal errors from the save subsystem (§7: "does not abort search").
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot parse error: {0}")]
    Parse(String),
}
