//! Board: a fixed R×C grid of cells, each empty or holding a [`Placement`].
//!
//! Board does not validate; it accepts any placement (spec §4.1). The
//! engine is responsible for only ever calling `place` with a placement
//! it has already checked against [`crate::edge_index`]/[`crate::domain`].

use crate::piece::Placement;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Option<Placement>>,
}

impl Board {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    #[inline]
    pub fn is_empty(&self, row: usize, col: usize) -> bool {
        self.cells[self.index(row, col)].is_none()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Placement> {
        self.cells[self.index(row, col)]
    }

    #[inline]
    pub fn place(&mut self, row: usize, col: usize, placement: Placement) {
        let idx = self.index(row, col);
        self.cells[idx] = Some(placement);
    }

    #[inline]
    pub fn remove(&mut self, row: usize, col: usize) -> Option<Placement> {
        let idx = self.index(row, col);
        self.cells[idx].take()
    }

    /// True when this cell's side faces outside the grid (needs label 0).
    #[inline]
    pub fn is_boundary_side(&self, row: usize, col: usize, side: crate::piece::Side) -> bool {
        use crate::piece::Side::*;
        match side {
            North => row == 0,
            South => row + 1 == self.rows,
            West => col == 0,
            East => col + 1 == self.cols,
        }
    }

    /// Neighbor coordinate in `side` direction, if in bounds.
    #[inline]
    pub fn neighbor(&self, row: usize, col: usize, side: crate::piece::Side) -> Option<(usize, usize)> {
        let (dr, dc) = side.delta();
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        if nr < 0 || nc < 0 {
            return None;
        }
        let (nr, nc) = (nr as usize, nc as usize);
        if self.in_bounds(nr, nc) {
            Some((nr, nc))
        } else {
            None
        }
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        (0..self.rows).flat_map(move |r| (0..cols).map(move |c| (r, c)))
    }

    /// Deep-copies the grid. [`Placement`]/[`crate::piece::Piece`] data is
    /// `Copy`, so this is a flat copy sharing no mutable sub-state
    /// (spec §9 "Board copy").
    pub fn deep_clone(&self) -> Board {
        self.clone()
    }
}
