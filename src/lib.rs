//! Eterniton edge-matching puzzle solver.
//!
//! A rectangular grid of cells, each filled with a uniquely-numbered
//! square piece in one of four rotations, such that every shared edge
//! between neighboring cells matches and every boundary-facing edge
//! carries label `0`. Backtracking search with MRV/LCV heuristics, AC-3
//! propagation, forced-move detection, symmetry breaking, optional
//! parallel search, and durable snapshot persistence.

pub mod board;
pub mod clock;
pub mod config;
pub mod domain;
pub mod edge_index;
pub mod engine;
pub mod error;
pub mod heuristics;
pub mod parallel;
pub mod piece;
pub mod propagate;
pub mod puzzle;
pub mod save;
pub mod shared;
pub mod singleton;
pub mod symmetry;
