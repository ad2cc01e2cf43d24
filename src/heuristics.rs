//! Variable (MRV) and value (LCV) ordering for the backtracking search
//! (spec §4.5). Modeled as a small capability-interface trait pair per
//! spec §9, each with one concrete implementation.

use rustc_hash::FxHashMap;

use crate::board::Board;
use crate::config::SortOrder;
use crate::domain::{Cell, DomainStore};
use crate::edge_index::EdgeIndex;
use crate::piece::SIDES;
use crate::puzzle::PieceSet;

/// Selects the next cell to branch on.
pub trait VariableSelector {
    fn select(&self, board: &Board, store: &DomainStore, prioritize_borders: bool) -> Option<Cell>;
}

/// Orders `(piece, rotation)` candidates at a chosen cell.
pub trait ValueOrderer {
    fn order(&self, cell: Cell, store: &DomainStore, sort_order: SortOrder) -> Vec<(u32, u8)>;
}

#[inline]
fn is_border_cell(board: &Board, cell: Cell) -> bool {
    cell.0 == 0 || cell.1 == 0 || cell.0 + 1 == board.rows() || cell.1 + 1 == board.cols()
}

/// Neighbors of `cell` that are themselves on the border — the ring
/// topology "along the border" spec §4.5's trap definition refers to.
fn border_ring_neighbors(board: &Board, cell: Cell) -> Vec<Cell> {
    SIDES
        .iter()
        .filter_map(|&side| board.neighbor(cell.0, cell.1, side))
        .filter(|&n| is_border_cell(board, n))
        .collect()
}

/// Would placing at `cell` leave some empty border neighbor surrounded
/// by filled cells on both sides along the border ring (spec §4.5)?
fn creates_border_trap(board: &Board, cell: Cell) -> bool {
    if !is_border_cell(board, cell) {
        return false;
    }
    for neighbor in border_ring_neighbors(board, cell) {
        if !board.is_empty(neighbor.0, neighbor.1) {
            continue;
        }
        let ring = border_ring_neighbors(board, neighbor);
        if ring.is_empty() {
            continue;
        }
        let all_filled_after = ring
            .iter()
            .all(|&rn| rn == cell || !board.is_empty(rn.0, rn.1));
        if all_filled_after {
            return true;
        }
    }
    false
}

fn occupied_neighbor_count(board: &Board, cell: Cell) -> usize {
    SIDES
        .iter()
        .filter_map(|&side| board.neighbor(cell.0, cell.1, side))
        .filter(|&(r, c)| !board.is_empty(r, c))
        .count()
}

fn manhattan_distance_to_center(board: &Board, cell: Cell) -> i64 {
    // doubled coordinates avoid fractional centers on even dimensions
    let center_r2 = (board.rows() as i64) - 1;
    let center_c2 = (board.cols() as i64) - 1;
    let r2 = 2 * cell.0 as i64;
    let c2 = 2 * cell.1 as i64;
    (r2 - center_r2).abs() + (c2 - center_c2).abs()
}

/// Sort key for MRV, in the five-level tie-break order of spec §4.5.
/// Smallest key wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct MrvKey {
    domain_size: usize,
    not_border_first: u8, // 0 if border cell and prioritize_borders, 1 otherwise
    creates_trap: u8,     // 0 if no trap, 1 if trap
    neg_occupied_neighbors: i64,
    manhattan_to_center: i64,
    rotation_count: usize,
}

#[derive(Debug, Default)]
pub struct MrvSelector;

impl VariableSelector for MrvSelector {
    fn select(&self, board: &Board, store: &DomainStore, prioritize_borders: bool) -> Option<Cell> {
        let mut best: Option<(MrvKey, Cell)> = None;

        for cell in board.iter_cells() {
            if !board.is_empty(cell.0, cell.1) {
                continue;
            }
            let domain_size = store.cell_piece_count(cell.0, cell.1);
            if domain_size == 0 {
                // zero-candidate cells dominate any key (domain_size sorts
                // first) and trigger immediate backtracking in the engine
                return Some(cell);
            }
            let not_border_first = if prioritize_borders && is_border_cell(board, cell) {
                0
            } else if prioritize_borders {
                1
            } else {
                0
            };
            let key = MrvKey {
                domain_size,
                not_border_first,
                creates_trap: creates_border_trap(board, cell) as u8,
                neg_occupied_neighbors: -(occupied_neighbor_count(board, cell) as i64),
                manhattan_to_center: manhattan_distance_to_center(board, cell),
                rotation_count: store.cell_rotation_count(cell.0, cell.1),
            };
            match &best {
                Some((best_key, _)) if *best_key <= key => {}
                _ => best = Some((key, cell)),
            }
        }

        best.map(|(_, cell)| cell)
    }
}

/// Precomputed "constrainedness" score per piece: sum, over its four
/// edges, of the number of *other* pieces exposing that label in any
/// rotation (spec §4.5).
pub fn piece_difficulty(pieces: &PieceSet, _edge_index: &EdgeIndex) -> FxHashMap<u32, u64> {
    let mut exposers_by_label: FxHashMap<u16, rustc_hash::FxHashSet<u32>> = FxHashMap::default();
    for side in SIDES {
        for piece in pieces.iter() {
            for rotation in 0..4u8 {
                let label = piece.edge_on(side, rotation);
                exposers_by_label.entry(label).or_default().insert(piece.id);
            }
        }
    }
    let mut scores = FxHashMap::default();
    for piece in pieces.iter() {
        let mut score = 0u64;
        for label in piece.edges() {
            if let Some(exposers) = exposers_by_label.get(&label) {
                score += exposers.iter().filter(|&&id| id != piece.id).count() as u64;
            }
        }
        scores.insert(piece.id, score);
    }
    scores
}

#[derive(Debug)]
pub struct LcvOrderer {
    pub difficulty: FxHashMap<u32, u64>,
}

impl ValueOrderer for LcvOrderer {
    fn order(&self, cell: Cell, store: &DomainStore, sort_order: SortOrder) -> Vec<(u32, u8)> {
        let mut candidates: Vec<(u32, u8)> = store
            .domain(cell.0, cell.1)
            .map(|d| d.candidates().collect())
            .unwrap_or_default();

        candidates.sort_by_key(|&(piece_id, rotation)| {
            let score = *self.difficulty.get(&piece_id).unwrap_or(&0);
            (
                match sort_order {
                    SortOrder::Ascending => score as i64,
                    SortOrder::Descending => -(score as i64),
                },
                piece_id,
                rotation,
            )
        });

        candidates
    }
}
