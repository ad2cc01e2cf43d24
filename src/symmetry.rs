//! Rotation-fixing and lexicographic corner ordering (spec §4.7).
//!
//! Two rules collapse the 4-way rotational symmetry of solutions:
//! the piece at `(0,0)` must be at rotation 0, and each of the three
//! other corners must receive a piece id ≥ the id placed at `(0,0)`.
//! A third option, reflection pruning, is defined in spec §4.7 but left
//! off by default — `SymmetryBreaker` carries the flag but no reflection
//! logic is implemented, since spec.md does not specify its rules.

use crate::board::Board;
use crate::domain::Cell;

#[derive(Debug, Clone, Copy)]
pub struct SymmetryBreaker {
    pub enabled: bool,
    /// Off by default; spec §4.7 names it but leaves its rules unspecified.
    pub reflection_pruning: bool,
}

impl Default for SymmetryBreaker {
    fn default() -> Self {
        Self {
            enabled: true,
            reflection_pruning: false,
        }
    }
}

impl SymmetryBreaker {
    pub fn corners(board: &Board) -> [Cell; 4] {
        [
            (0, 0),
            (0, board.cols() - 1),
            (board.rows() - 1, 0),
            (board.rows() - 1, board.cols() - 1),
        ]
    }

    /// Is `(piece_id, rotation)` an acceptable candidate at `cell`, given
    /// the piece id already committed at `(0,0)` (if any)?
    ///
    /// Resolution of the "first forced placement at a non-corner cell"
    /// open question (spec §9): symmetry rules apply only at the four
    /// corner cells themselves. If MRV or a singleton forces a
    /// non-corner cell first, these rules simply have not triggered yet
    /// — they neither block nor retroactively constrain it.
    pub fn accepts(
        &self,
        board: &Board,
        cell: Cell,
        piece_id: u32,
        rotation: u8,
        top_left_piece_id: Option<u32>,
    ) -> bool {
        if !self.enabled {
            return true;
        }

        let corners = Self::corners(board);

        if cell == corners[0] {
            // rotation fixing: piece at (0,0) must be rotation 0
            return rotation == 0;
        }

        if corners[1..].contains(&cell) {
            if let Some(top_left_id) = top_left_piece_id {
                return piece_id >= top_left_id;
            }
        }

        true
    }
}
