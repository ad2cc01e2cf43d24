//! Per-empty-cell candidate domains, with a change-frame stack so that
//! restoring after backtrack is O(frame size), not O(board size)
//! (spec §4.3, §9).

use rustc_hash::FxHashMap;

use crate::board::Board;
use crate::edge_index::EdgeIndex;
use crate::piece::{Placement, Rotation, SIDES};
use crate::puzzle::PieceSet;

/// Cell coordinate, `(row, col)`.
pub type Cell = (usize, usize);

/// `pieceId -> non-empty list of rotations` fittable at one cell, given
/// the current partial assignment (spec §3 "Domain").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Domain {
    rotations: FxHashMap<u32, Vec<Rotation>>,
}

impl Domain {
    #[inline]
    pub fn piece_count(&self) -> usize {
        self.rotations.len()
    }

    #[inline]
    pub fn rotation_count(&self) -> usize {
        self.rotations.values().map(Vec::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    #[inline]
    pub fn rotations_for(&self, piece_id: u32) -> &[Rotation] {
        self.rotations
            .get(&piece_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[Rotation])> {
        self.rotations.iter().map(|(&p, r)| (p, r.as_slice()))
    }

    pub fn candidates(&self) -> impl Iterator<Item = (u32, Rotation)> + '_ {
        self.rotations
            .iter()
            .flat_map(|(&p, rs)| rs.iter().map(move |&r| (p, r)))
    }

    fn insert(&mut self, piece_id: u32, rotation: Rotation) {
        self.rotations.entry(piece_id).or_default().push(rotation);
    }
}

#[derive(Debug, Clone)]
struct ChangeFrame {
    /// `(cell, prior domain value)`, inserted lazily the first time a
    /// cell is touched by this frame. Consumed cells record `None` as
    /// their prior domain's *replacement*, but the map stores the prior
    /// value, which may itself be `None` if the neighbor was already
    /// consumed earlier.
    snapshots: FxHashMap<Cell, Option<Domain>>,
}

/// Maps cell coordinate -> [`Domain`] (spec §4.3 "DomainStore").
pub struct DomainStore {
    cols: usize,
    /// `None` means the cell is placed (its domain was consumed).
    domains: Vec<Option<Domain>>,
    frames: Vec<ChangeFrame>,
}

impl DomainStore {
    fn index(&self, cell: Cell) -> usize {
        cell.0 * self.cols + cell.1
    }

    /// Builds the initial domain store from [`EdgeIndex`] and any fixed
    /// placements already applied to `board` (spec §4.3 `init`).
    pub fn init(board: &Board, pieces: &PieceSet, edge_index: &EdgeIndex, used: &[u32]) -> Self {
        let rows = board.rows();
        let cols = board.cols();
        let used_set: rustc_hash::FxHashSet<u32> = used.iter().copied().collect();

        let mut domains = vec![None; rows * cols];
        for (r, c) in board.iter_cells() {
            if !board.is_empty(r, c) {
                continue;
            }
            domains[r * cols + c] = Some(Self::candidates_for_cell(
                board, pieces, edge_index, &used_set, r, c,
            ));
        }

        Self {
            cols,
            domains,
            frames: Vec::new(),
        }
    }

    fn candidates_for_cell(
        board: &Board,
        pieces: &PieceSet,
        edge_index: &EdgeIndex,
        used: &rustc_hash::FxHashSet<u32>,
        r: usize,
        c: usize,
    ) -> Domain {
        let mut constraints = Vec::with_capacity(4);
        for side in SIDES {
            if board.is_boundary_side(r, c, side) {
                constraints.push((side, 0u16));
            } else if let Some((nr, nc)) = board.neighbor(r, c, side) {
                if let Some(placement) = board.get(nr, nc) {
                    constraints.push((side, placement.edge_on(side.opposite())));
                }
            }
        }

        let mut domain = Domain::default();

        if constraints.is_empty() {
            for piece in pieces.iter() {
                if used.contains(&piece.id) {
                    continue;
                }
                for rotation in 0..4u8 {
                    domain.insert(piece.id, rotation);
                }
            }
            return domain;
        }

        // Seed from the smallest-looking constrained side's exposure set,
        // then verify the rest directly (spec §4.2: intersection of up to
        // four sets).
        let (seed_side, seed_label) = constraints[0];
        for exposure in edge_index.exposing(seed_side, seed_label) {
            if used.contains(&exposure.piece_id) {
                continue;
            }
            let Some(piece) = pieces.get(exposure.piece_id) else {
                continue;
            };
            let edges = piece.edges_rotated(exposure.rotation);
            let fits = constraints
                .iter()
                .all(|&(side, label)| edges[side.index()] == label);
            if fits {
                domain.insert(exposure.piece_id, exposure.rotation);
            }
        }

        domain
    }

    #[inline]
    pub fn domain(&self, r: usize, c: usize) -> Option<&Domain> {
        self.domains[self.index((r, c))].as_ref()
    }

    #[inline]
    pub fn cell_piece_count(&self, r: usize, c: usize) -> usize {
        self.domain(r, c).map(Domain::piece_count).unwrap_or(0)
    }

    #[inline]
    pub fn cell_rotation_count(&self, r: usize, c: usize) -> usize {
        self.domain(r, c).map(Domain::rotation_count).unwrap_or(0)
    }

    fn record_before_mutation(&mut self, cell: Cell) {
        let idx = self.index(cell);
        let prior = self.domains[idx].clone();
        let frame = self.frames.last_mut().expect("mutation outside a placement frame");
        frame.snapshots.entry(cell).or_insert(prior);
    }

    /// Pushes a change frame, consumes `(r,c)`, removes `piece_id`
    /// everywhere else (no-repeat), and restricts each neighbor to
    /// rotations whose facing edge matches the newly placed edge
    /// (spec §4.3 `applyPlacement`; transitive AC-3 propagation is
    /// [`crate::propagate::propagate`]'s job, run on the same frame
    /// right after this call).
    pub fn apply_placement(
        &mut self,
        board: &Board,
        pieces: &PieceSet,
        r: usize,
        c: usize,
        placement: Placement,
    ) {
        self.frames.push(ChangeFrame {
            snapshots: FxHashMap::default(),
        });

        self.record_before_mutation((r, c));
        self.domains[self.index((r, c))] = None;

        let piece_id = placement.piece_id;
        for (row, col) in board.iter_cells() {
            if (row, col) == (r, c) {
                continue;
            }
            if self.domains[self.index((row, col))]
                .as_ref()
                .map(|d| !d.rotations_for(piece_id).is_empty())
                .unwrap_or(false)
            {
                self.record_before_mutation((row, col));
                if let Some(d) = self.domains[self.index((row, col))].as_mut() {
                    d.rotations.remove(&piece_id);
                }
            }
        }

        for side in SIDES {
            if let Some((nr, nc)) = board.neighbor(r, c, side) {
                if self.domains[self.index((nr, nc))].is_none() {
                    continue;
                }
                let needed = placement.edge_on(side);
                let facing = side.opposite();
                self.record_before_mutation((nr, nc));
                if let Some(d) = self.domains[self.index((nr, nc))].as_mut() {
                    let mut empty_pieces = Vec::new();
                    for (pid, rotations) in d.rotations.iter_mut() {
                        let Some(piece) = pieces.get(*pid) else {
                            rotations.clear();
                            continue;
                        };
                        rotations.retain(|&rot| piece.edge_on(facing, rot) == needed);
                        if rotations.is_empty() {
                            empty_pieces.push(*pid);
                        }
                    }
                    for pid in empty_pieces {
                        d.rotations.remove(&pid);
                    }
                }
            }
        }
    }

    /// Pops the most recent frame, exactly restoring prior domains.
    pub fn undo(&mut self) {
        let frame = self.frames.pop().expect("undo without a matching placement");
        for (cell, prior) in frame.snapshots {
            let idx = self.index(cell);
            self.domains[idx] = prior;
        }
    }

    /// Removes a single `(piece, rotation)` candidate from `cell`'s
    /// domain. Returns `true` if it was present. Used by the AC-3
    /// propagator within the current (top) frame.
    pub fn remove_candidate(&mut self, cell: Cell, piece_id: u32, rotation: Rotation) -> bool {
        let idx = self.index(cell);
        let present = self.domains[idx]
            .as_ref()
            .map(|d| d.rotations_for(piece_id).contains(&rotation))
            .unwrap_or(false);
        if !present {
            return false;
        }
        self.record_before_mutation(cell);
        if let Some(d) = self.domains[idx].as_mut() {
            if let Some(v) = d.rotations.get_mut(&piece_id) {
                v.retain(|&r| r != rotation);
                if v.is_empty() {
                    d.rotations.remove(&piece_id);
                }
            }
        }
        true
    }

    pub fn is_consumed(&self, cell: Cell) -> bool {
        self.domains[self.index(cell)].is_none()
    }
}
