//! Atomic, content-addressed snapshot persistence (spec §4.11).
//!
//! Every write goes through write-to-temp + rename within the target
//! directory. At most one `current_*` file is kept per config; `best_*`
//! milestone files beyond `MAX_BACKUP` are pruned oldest-first. A
//! `parking_lot::Mutex` keyed by configId serializes writes within one
//! process; the temp-then-rename discipline provides crash safety
//! across processes without a file lock (spec §5).

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::SnapshotError;

use super::snapshot::Snapshot;
use super::{binary, text};

pub const MAX_BACKUP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Binary,
    Text,
}

impl SnapshotFormat {
    fn ext(self) -> &'static str {
        match self {
            SnapshotFormat::Binary => "bin",
            SnapshotFormat::Text => "txt",
        }
    }
}

/// Shared-immutable facade (spec §3 "Ownership"); internal
/// per-configuration locking makes it safe to hold one instance behind
/// an `Arc` and pass it into every sequential and parallel code path.
pub struct SaveStore {
    root: PathBuf,
    format: SnapshotFormat,
    locks: Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
}

impl SaveStore {
    pub fn new(root: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        Self {
            root: root.into(),
            format,
            locks: Mutex::new(FxHashMap::default()),
        }
    }

    fn config_dir(&self, puzzle_class: &str, config_id: &str) -> PathBuf {
        self.root.join(puzzle_class).join(config_id)
    }

    fn config_lock(&self, puzzle_class: &str, config_id: &str) -> Arc<Mutex<()>> {
        let key = format!("{puzzle_class}/{config_id}");
        let mut locks = self.locks.lock();
        locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn encode(&self, snap: &Snapshot) -> Vec<u8> {
        let mut buf = Vec::new();
        match self.format {
            SnapshotFormat::Binary => binary::write(&mut buf, snap).expect("writing to Vec cannot fail"),
            SnapshotFormat::Text => text::write(&mut buf, snap).expect("writing to Vec cannot fail"),
        }
        buf
    }

    fn decode(&self, bytes: &[u8]) -> Result<Snapshot, SnapshotError> {
        match self.format {
            SnapshotFormat::Binary => binary::read(&mut &bytes[..]),
            SnapshotFormat::Text => text::read(BufReader::new(bytes)),
        }
    }

    /// Write-to-temp + rename within `dir`, never leaving a partially
    /// written file at `final_path`.
    fn atomic_write(dir: &Path, final_path: &Path, bytes: &[u8]) -> Result<(), SnapshotError> {
        fs::create_dir_all(dir)?;
        let tmp_path = dir.join(format!(
            ".tmp-{}-{}",
            std::process::id(),
            final_path.file_name().and_then(|n| n.to_str()).unwrap_or("snapshot")
        ));
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, final_path)?;
        Ok(())
    }

    /// Periodic in-progress snapshot (spec §4.8: every 30s of wall time).
    pub fn write_current(
        &self,
        puzzle_class: &str,
        config_id: &str,
        snap: &Snapshot,
    ) -> Result<(), SnapshotError> {
        let lock = self.config_lock(puzzle_class, config_id);
        let _guard = lock.lock();

        let dir = self.config_dir(puzzle_class, config_id);
        let bytes = self.encode(snap);
        let final_path = dir.join(format!("current_{}.{}", snap.timestamp, self.format.ext()));
        Self::atomic_write(&dir, &final_path, &bytes)?;

        if let Ok(entries) = fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with("current_") && entry.path() != final_path {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }

        Ok(())
    }

    /// Milestone snapshot on a new best depth (spec §4.8), preserved for
    /// historical inspection and pruned to `MAX_BACKUP` newest.
    pub fn write_milestone(
        &self,
        puzzle_class: &str,
        config_id: &str,
        snap: &Snapshot,
    ) -> Result<(), SnapshotError> {
        let lock = self.config_lock(puzzle_class, config_id);
        let _guard = lock.lock();

        let dir = self.config_dir(puzzle_class, config_id);
        let bytes = self.encode(snap);
        let final_path = dir.join(format!("best_{}.{}", snap.depth, self.format.ext()));
        Self::atomic_write(&dir, &final_path, &bytes)?;

        self.prune_best_files(&dir)?;
        Ok(())
    }

    fn prune_best_files(&self, dir: &Path) -> Result<(), SnapshotError> {
        let mut best_files: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
        let Ok(entries) = fs::read_dir(dir) else {
            return Ok(());
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("best_") {
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                best_files.push((modified, entry.path()));
            }
        }
        if best_files.len() <= MAX_BACKUP {
            return Ok(());
        }
        best_files.sort_by_key(|(modified, _)| *modified);
        let excess = best_files.len() - MAX_BACKUP;
        for (_, path) in best_files.into_iter().take(excess) {
            let _ = fs::remove_file(path);
        }
        Ok(())
    }

    /// Finds the newest `current_*` for `configId` (if any), reads it,
    /// and completes a legacy-short `placementOrder` (spec §4.11
    /// "Resume"). Returns `Ok(None)` when there is nothing to resume
    /// from, without that being an error.
    pub fn resume(
        &self,
        puzzle_class: &str,
        config_id: &str,
    ) -> Result<Option<Snapshot>, SnapshotError> {
        let dir = self.config_dir(puzzle_class, config_id);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Ok(None);
        };

        let mut newest: Option<(u64, PathBuf)> = None;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(rest) = name.strip_prefix("current_") else {
                continue;
            };
            let Some(ts_str) = rest.split('.').next() else {
                continue;
            };
            let Ok(ts) = ts_str.parse::<u64>() else {
                continue;
            };
            if newest.as_ref().map(|(best, _)| ts > *best).unwrap_or(true) {
                newest = Some((ts, entry.path()));
            }
        }

        let Some((_, path)) = newest else {
            return Ok(None);
        };

        let bytes = fs::read(&path)?;
        let mut snap = self.decode(&bytes)?;

        if snap.complete_legacy_placement_order() {
            log::warn!(
                "resumed snapshot at {} had a short placementOrder; completed by (row,col) order, which approximates but does not equal true chronological order",
                path.display()
            );
        }

        Ok(Some(snap))
    }
}
