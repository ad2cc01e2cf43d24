//! Precomputed maps from edge label to the pieces (and rotations) that
//! expose that label on a given side.
//!
//! Built once per puzzle; immutable (spec §4.2).

use rustc_hash::FxHashMap;

use crate::piece::{Label, Piece, Rotation, Side, SIDES};

/// `(piece_id, rotation)` exposing a label on some side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Exposure {
    pub piece_id: u32,
    pub rotation: Rotation,
}

#[derive(Debug, Default)]
pub struct EdgeIndex {
    // one map per side: label -> pieces exposing it on that side in some rotation
    by_side: [FxHashMap<Label, Vec<Exposure>>; 4],
}

impl EdgeIndex {
    /// Builds the index in one pass over all pieces × 4 rotations.
    pub fn build(pieces: &[Piece]) -> Self {
        let mut by_side: [FxHashMap<Label, Vec<Exposure>>; 4] = Default::default();

        for piece in pieces {
            for rotation in 0..4u8 {
                let edges = piece.edges_rotated(rotation);
                for side in SIDES {
                    let label = edges[side.index()];
                    by_side[side.index()]
                        .entry(label)
                        .or_default()
                        .push(Exposure {
                            piece_id: piece.id,
                            rotation,
                        });
                }
            }
        }

        Self { by_side }
    }

    /// Pieces (with rotation) that expose `label` on `side`. O(1) lookup.
    pub fn exposing(&self, side: Side, label: Label) -> &[Exposure] {
        self.by_side[side.index()]
            .get(&label)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
