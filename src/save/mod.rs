//! Snapshot serialization, atomic write, and resume (spec §4.11).

pub mod binary;
pub mod snapshot;
pub mod store;
pub mod text;

pub use snapshot::{Snapshot, SnapshotPlacement};
pub use store::{SaveStore, SnapshotFormat};
