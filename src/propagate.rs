//! AC-3 arc-consistency propagation restricted to the neighbors of a
//! newly placed cell, propagated transitively (spec §4.4).

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::board::Board;
use crate::domain::{Cell, Domain, DomainStore};
use crate::piece::{Label, Side, SIDES};
use crate::puzzle::PieceSet;

/// A domain became empty during propagation — proof the current partial
/// assignment has no completion. Carries the cell that wiped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wipeout(pub Cell);

/// Runs AC-3 seeded from the up-to-four neighbors of `placed_cell`,
/// operating on the current (top) change frame of `store` so that a
/// caller's `DomainStore::undo()` rolls back both this call's removals
/// and the placement's own direct restriction together.
pub fn propagate(
    store: &mut DomainStore,
    board: &Board,
    pieces: &PieceSet,
    placed_cell: Cell,
) -> Result<(), Wipeout> {
    let mut queue: VecDeque<Cell> = VecDeque::new();
    let mut queued: FxHashSet<Cell> = FxHashSet::default();

    for side in SIDES {
        if let Some(n) = board.neighbor(placed_cell.0, placed_cell.1, side) {
            if store.domain(n.0, n.1).is_some() && queued.insert(n) {
                queue.push_back(n);
            }
        }
    }

    while let Some(u) = queue.pop_front() {
        queued.remove(&u);

        if store.domain(u.0, u.1).is_none() {
            // consumed by a different path since being enqueued; nothing to revise
            continue;
        }

        let mut changed = false;

        for side in SIDES {
            let Some(v) = board.neighbor(u.0, u.1, side) else {
                continue;
            };
            if store.domain(v.0, v.1).is_none() {
                // v already placed: the direct restriction in
                // `DomainStore::apply_placement` already enforced this
                // edge when v was placed.
                continue;
            }

            let candidates: Vec<(u32, u8)> = store
                .domain(u.0, u.1)
                .map(|d| d.candidates().collect())
                .unwrap_or_default();

            for (piece_id, rotation) in candidates {
                let Some(piece) = pieces.get(piece_id) else {
                    continue;
                };
                let label = piece.edge_on(side, rotation);
                let facing = side.opposite();
                if !has_support(store, pieces, v, facing, label) {
                    store.remove_candidate(u, piece_id, rotation);
                    changed = true;
                }
            }

            if store.domain(u.0, u.1).map(Domain::is_empty).unwrap_or(true) {
                return Err(Wipeout(u));
            }
        }

        if changed {
            for side in SIDES {
                if let Some(v) = board.neighbor(u.0, u.1, side) {
                    if store.domain(v.0, v.1).is_some() && queued.insert(v) {
                        queue.push_back(v);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Does `v`'s domain contain at least one candidate whose edge on
/// `facing` equals `label`?
fn has_support(store: &DomainStore, pieces: &PieceSet, v: Cell, facing: Side, label: Label) -> bool {
    let Some(domain) = store.domain(v.0, v.1) else {
        return false;
    };
    for (piece_id, rotations) in domain.iter() {
        let Some(piece) = pieces.get(piece_id) else {
            continue;
        };
        for &rotation in rotations {
            if piece.edge_on(facing, rotation) == label {
                return true;
            }
        }
    }
    false
}
