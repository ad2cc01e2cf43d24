//! The `Snapshot` value (spec §3): self-contained — restoring requires
//! only the snapshot and the original piece definitions.

use crate::piece::Rotation;
use crate::puzzle::FixedPlacement;

/// One placed piece as recorded in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPlacement {
    pub row: usize,
    pub col: usize,
    pub piece_id: u32,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub puzzle_id: String,
    pub rows: usize,
    pub cols: usize,
    pub timestamp: u64,
    pub cumulative_time_ms: u64,
    pub depth: usize,
    pub placements: Vec<SnapshotPlacement>,
    pub placement_order: Vec<SnapshotPlacement>,
    pub unused_piece_ids: Vec<u32>,
    pub fixed_placements: Vec<FixedPlacement>,
}

impl Snapshot {
    /// Appends placements missing from `placement_order`, sorted by
    /// `(row, col)`, for legacy saves whose stored order is shorter than
    /// the placements set (spec §4.11 "Resume"). The caller is
    /// responsible for logging the warning this approximation calls for.
    pub fn complete_legacy_placement_order(&mut self) -> bool {
        if self.placement_order.len() >= self.placements.len() {
            return false;
        }

        let mut seen: rustc_hash::FxHashSet<u32> = self
            .placement_order
            .iter()
            .map(|p| p.piece_id)
            .collect();

        let mut missing: Vec<SnapshotPlacement> = self
            .placements
            .iter()
            .copied()
            .filter(|p| !seen.contains(&p.piece_id))
            .collect();
        missing.sort_by_key(|p| (p.row, p.col));

        for p in &missing {
            seen.insert(p.piece_id);
        }
        self.placement_order.extend(missing);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(row: usize, col: usize, piece_id: u32) -> SnapshotPlacement {
        SnapshotPlacement {
            row,
            col,
            piece_id,
            rotation: 0,
        }
    }

    #[test]
    fn completes_legacy_order_sorted_by_row_col() {
        let mut snap = Snapshot {
            puzzle_id: "p".into(),
            rows: 2,
            cols: 2,
            timestamp: 0,
            cumulative_time_ms: 0,
            depth: 3,
            placements: vec![
                placement(0, 0, 1),
                placement(0, 1, 2),
                placement(1, 0, 3),
            ],
            placement_order: vec![placement(0, 0, 1)],
            unused_piece_ids: vec![],
            fixed_placements: vec![],
        };

        let changed = snap.complete_legacy_placement_order();
        assert!(changed);
        assert_eq!(snap.placement_order.len(), 3);
        assert_eq!(snap.placement_order[1].piece_id, 2);
        assert_eq!(snap.placement_order[2].piece_id, 3);
    }

    #[test]
    fn complete_order_is_noop_when_already_full() {
        let mut snap = Snapshot {
            puzzle_id: "p".into(),
            rows: 1,
            cols: 1,
            timestamp: 0,
            cumulative_time_ms: 0,
            depth: 1,
            placements: vec![placement(0, 0, 1)],
            placement_order: vec![placement(0, 0, 1)],
            unused_piece_ids: vec![],
            fixed_placements: vec![],
        };
        assert!(!snap.complete_legacy_placement_order());
    }
}
