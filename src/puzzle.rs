//! Puzzle definition value and the piece lookup built from it.

use rustc_hash::FxHashMap;

use crate::config::SortOrder;
use crate::error::PuzzleError;
use crate::piece::{Piece, Rotation};

/// `(row, col, pieceId, rotation)` applied before search and never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPlacement {
    pub row: usize,
    pub col: usize,
    pub piece_id: u32,
    pub rotation: Rotation,
}

/// `(rows, cols, pieces[], fixedPlacements[], sortOrder, prioritizeBorders)` (spec §3).
#[derive(Debug, Clone)]
pub struct Puzzle {
    pub rows: usize,
    pub cols: usize,
    pub pieces: Vec<Piece>,
    pub fixed_placements: Vec<FixedPlacement>,
    pub sort_order: SortOrder,
    pub prioritize_borders: bool,
}

impl Puzzle {
    pub fn new(rows: usize, cols: usize, pieces: Vec<Piece>) -> Self {
        Self {
            rows,
            cols,
            pieces,
            fixed_placements: Vec::new(),
            sort_order: SortOrder::Ascending,
            prioritize_borders: false,
        }
    }

    pub fn with_fixed_placements(mut self, fixed: Vec<FixedPlacement>) -> Self {
        self.fixed_placements = fixed;
        self
    }

    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    pub fn with_prioritize_borders(mut self, yes: bool) -> Self {
        self.prioritize_borders = yes;
        self
    }

    /// Validates the puzzle (§7 "Invalid-puzzle"), fatal on the whole run.
    pub fn validate(&self) -> Result<(), PuzzleError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(PuzzleError::EmptyGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }

        let mut seen = rustc_hash::FxHashSet::default();
        for piece in &self.pieces {
            if !seen.insert(piece.id) {
                return Err(PuzzleError::DuplicatePieceId(piece.id));
            }
        }

        let mut fixed_cells = rustc_hash::FxHashSet::default();
        let mut fixed_pieces: FxHashMap<u32, (usize, usize)> = FxHashMap::default();
        for fp in &self.fixed_placements {
            if fp.row >= self.rows || fp.col >= self.cols {
                return Err(PuzzleError::FixedPlacementOutOfBounds {
                    row: fp.row,
                    col: fp.col,
                    rows: self.rows,
                    cols: self.cols,
                });
            }
            if !seen.contains(&fp.piece_id) {
                return Err(PuzzleError::UnknownFixedPiece {
                    row: fp.row,
                    col: fp.col,
                    piece_id: fp.piece_id,
                });
            }
            if !fixed_cells.insert((fp.row, fp.col)) {
                return Err(PuzzleError::DuplicateFixedCell {
                    row: fp.row,
                    col: fp.col,
                });
            }
            if let Some(&(r, c)) = fixed_pieces.get(&fp.piece_id) {
                return Err(PuzzleError::ConflictingFixedPlacement {
                    piece_id: fp.piece_id,
                    r1: r,
                    c1: c,
                    r2: fp.row,
                    c2: fp.col,
                });
            }
            fixed_pieces.insert(fp.piece_id, (fp.row, fp.col));
        }

        Ok(())
    }
}

/// Shared-immutable lookup from piece id to [`Piece`] (spec §3 "Ownership").
#[derive(Debug, Clone)]
pub struct PieceSet {
    by_id: FxHashMap<u32, Piece>,
    ids_in_order: Vec<u32>,
}

impl PieceSet {
    pub fn from_pieces(pieces: &[Piece]) -> Self {
        let mut by_id = FxHashMap::default();
        let mut ids_in_order = Vec::with_capacity(pieces.len());
        for p in pieces {
            by_id.insert(p.id, *p);
            ids_in_order.push(p.id);
        }
        Self {
            by_id,
            ids_in_order,
        }
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&Piece> {
        self.by_id.get(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids_in_order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids_in_order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.ids_in_order.iter().map(move |id| &self.by_id[id])
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids_in_order.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(id: u32) -> Piece {
        Piece::new(id, [0, 0, 0, 0])
    }

    #[test]
    fn rejects_duplicate_piece_ids() {
        let puzzle = Puzzle::new(1, 1, vec![piece(1), piece(1)]);
        assert_eq!(
            puzzle.validate(),
            Err(PuzzleError::DuplicatePieceId(1))
        );
    }

    #[test]
    fn rejects_fixed_placement_to_unknown_piece() {
        let puzzle = Puzzle::new(1, 1, vec![piece(1)]).with_fixed_placements(vec![
            FixedPlacement {
                row: 0,
                col: 0,
                piece_id: 99,
                rotation: 0,
            },
        ]);
        assert_eq!(
            puzzle.validate(),
            Err(PuzzleError::UnknownFixedPiece {
                row: 0,
                col: 0,
                piece_id: 99
            })
        );
    }

    #[test]
    fn rejects_conflicting_fixed_placements() {
        let puzzle = Puzzle::new(1, 2, vec![piece(1)]).with_fixed_placements(vec![
            FixedPlacement {
                row: 0,
                col: 0,
                piece_id: 1,
                rotation: 0,
            },
            FixedPlacement {
                row: 0,
                col: 1,
                piece_id: 1,
                rotation: 0,
            },
        ]);
        assert!(matches!(
            puzzle.validate(),
            Err(PuzzleError::ConflictingFixedPlacement { .. })
        ));
    }

    #[test]
    fn accepts_well_formed_puzzle() {
        let puzzle = Puzzle::new(1, 1, vec![piece(1)]).with_fixed_placements(vec![
            FixedPlacement {
                row: 0,
                col: 0,
                piece_id: 1,
                rotation: 0,
            },
        ]);
        assert!(puzzle.validate().is_ok());
    }
}
