//! Forced-move detection: a cell with exactly one candidate, or a piece
//! with exactly one fitting cell (spec §4.6).

use rustc_hash::FxHashMap;

use crate::board::Board;
use crate::domain::{Cell, DomainStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Singleton {
    pub cell: Cell,
    pub piece_id: u32,
    pub rotation: u8,
}

/// Scans once (O(cells × avg domain)): first for a cell with exactly
/// one `(piece, rotation)` candidate, then for a piece with exactly one
/// fitting `(cell, rotation)` across all empty cells.
pub fn find_singleton(board: &Board, store: &DomainStore) -> Option<Singleton> {
    for cell in board.iter_cells() {
        if !board.is_empty(cell.0, cell.1) {
            continue;
        }
        let Some(domain) = store.domain(cell.0, cell.1) else {
            continue;
        };
        if domain.rotation_count() == 1 {
            let (piece_id, rotations) = domain.iter().next().expect("rotation_count == 1");
            return Some(Singleton {
                cell,
                piece_id,
                rotation: rotations[0],
            });
        }
    }

    let mut occurrences: FxHashMap<u32, Vec<(Cell, u8)>> = FxHashMap::default();
    for cell in board.iter_cells() {
        if !board.is_empty(cell.0, cell.1) {
            continue;
        }
        let Some(domain) = store.domain(cell.0, cell.1) else {
            continue;
        };
        for (piece_id, rotations) in domain.iter() {
            let entry = occurrences.entry(piece_id).or_default();
            for &rotation in rotations {
                entry.push((cell, rotation));
                if entry.len() > 1 {
                    break;
                }
            }
        }
    }

    for (piece_id, occ) in occurrences {
        if occ.len() == 1 {
            let (cell, rotation) = occ[0];
            return Some(Singleton {
                cell,
                piece_id,
                rotation,
            });
        }
    }

    None
}
