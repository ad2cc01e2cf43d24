//! Compact binary snapshot format (spec §4.11), little-endian throughout
//! (SPEC_FULL.md §9 open-question resolution: endianness is not explicit
//! in spec.md, so this repo picks little-endian, matching the teacher's
//! `to_le_bytes` persistence format, and documents it here on the
//! version field).
//!
//! Layout, in order:
//! - magic `0x45544552` ("ETER"), u32
//! - version, u32 (bump this if the layout below changes)
//! - timestamp, u64
//! - rows, u32; cols, u32
//! - placementCount, u32; then per placement: row u16, col u16, pieceId u16, rotation u8
//! - maxPieceId, u32; then `maxPieceId` "used" booleans, u8 0/1
//!
//! spec.md names only the fields above; to satisfy the round-trip
//! property (spec §8 property 6) against `Snapshot`'s full contents,
//! this format appends, in the same style:
//! - depth, u32
//! - cumulativeTimeMs, u64
//! - puzzleId: length u32 + UTF-8 bytes
//! - placementOrderCount, u32; then per entry: row u16, col u16, pieceId u16, rotation u8
//! - fixedPlacementCount, u32; then per entry: row u16, col u16, pieceId u16, rotation u8

use std::io::{self, Read, Write};

use crate::error::SnapshotError;
use crate::puzzle::FixedPlacement;

use super::snapshot::{Snapshot, SnapshotPlacement};

pub const MAGIC: u32 = 0x4554_4552;
pub const VERSION: u32 = 1;

pub fn write<W: Write>(w: &mut W, snap: &Snapshot) -> io::Result<()> {
    w.write_all(&MAGIC.to_le_bytes())?;
    w.write_all(&VERSION.to_le_bytes())?;
    w.write_all(&snap.timestamp.to_le_bytes())?;
    w.write_all(&(snap.rows as u32).to_le_bytes())?;
    w.write_all(&(snap.cols as u32).to_le_bytes())?;

    write_placements(w, &snap.placements)?;

    let max_piece_id = snap
        .unused_piece_ids
        .iter()
        .copied()
        .chain(snap.placements.iter().map(|p| p.piece_id))
        .max()
        .unwrap_or(0);
    w.write_all(&max_piece_id.to_le_bytes())?;
    let used: rustc_hash::FxHashSet<u32> = snap.placements.iter().map(|p| p.piece_id).collect();
    // piece ids are positive integers (spec §3); the `maxPieceId` booleans
    // cover ids `1..=maxPieceId`.
    for id in 1..=max_piece_id {
        w.write_all(&[used.contains(&id) as u8])?;
    }

    w.write_all(&(snap.depth as u32).to_le_bytes())?;
    w.write_all(&snap.cumulative_time_ms.to_le_bytes())?;

    let puzzle_id_bytes = snap.puzzle_id.as_bytes();
    w.write_all(&(puzzle_id_bytes.len() as u32).to_le_bytes())?;
    w.write_all(puzzle_id_bytes)?;

    write_placements(w, &snap.placement_order)?;

    let fixed: Vec<SnapshotPlacement> = snap
        .fixed_placements
        .iter()
        .map(|f| SnapshotPlacement {
            row: f.row,
            col: f.col,
            piece_id: f.piece_id,
            rotation: f.rotation,
        })
        .collect();
    write_placements(w, &fixed)?;

    Ok(())
}

fn write_placements<W: Write>(w: &mut W, placements: &[SnapshotPlacement]) -> io::Result<()> {
    w.write_all(&(placements.len() as u32).to_le_bytes())?;
    for p in placements {
        w.write_all(&(p.row as u16).to_le_bytes())?;
        w.write_all(&(p.col as u16).to_le_bytes())?;
        w.write_all(&(p.piece_id as u16).to_le_bytes())?;
        w.write_all(&[p.rotation])?;
    }
    Ok(())
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32, SnapshotError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)
        .map_err(|e| SnapshotError::Parse(format!("truncated u32: {e}")))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64, SnapshotError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)
        .map_err(|e| SnapshotError::Parse(format!("truncated u64: {e}")))?;
    Ok(u64::from_le_bytes(buf))
}

fn read_u16<R: Read>(r: &mut R) -> Result<u16, SnapshotError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)
        .map_err(|e| SnapshotError::Parse(format!("truncated u16: {e}")))?;
    Ok(u16::from_le_bytes(buf))
}

fn read_placements<R: Read>(r: &mut R) -> Result<Vec<SnapshotPlacement>, SnapshotError> {
    let count = read_u32(r)? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let row = read_u16(r)? as usize;
        let col = read_u16(r)? as usize;
        let piece_id = read_u16(r)? as u32;
        let mut rot_buf = [0u8; 1];
        r.read_exact(&mut rot_buf)
            .map_err(|e| SnapshotError::Parse(format!("truncated rotation: {e}")))?;
        out.push(SnapshotPlacement {
            row,
            col,
            piece_id,
            rotation: rot_buf[0],
        });
    }
    Ok(out)
}

pub fn read<R: Read>(r: &mut R) -> Result<Snapshot, SnapshotError> {
    let magic = read_u32(r)?;
    if magic != MAGIC {
        return Err(SnapshotError::Parse(format!(
            "bad magic: expected {MAGIC:#x}, found {magic:#x}"
        )));
    }
    let version = read_u32(r)?;
    if version != VERSION {
        return Err(SnapshotError::Parse(format!(
            "unsupported snapshot version {version}"
        )));
    }
    let timestamp = read_u64(r)?;
    let rows = read_u32(r)? as usize;
    let cols = read_u32(r)? as usize;

    let placements = read_placements(r)?;

    let max_piece_id = read_u32(r)?;
    let mut used_flags = vec![0u8; max_piece_id as usize];
    r.read_exact(&mut used_flags)
        .map_err(|e| SnapshotError::Parse(format!("truncated used-flags: {e}")))?;
    let unused_piece_ids: Vec<u32> = (1..=max_piece_id)
        .filter(|&id| used_flags[(id - 1) as usize] == 0)
        .collect();

    let depth = read_u32(r)? as usize;
    let cumulative_time_ms = read_u64(r)?;

    let puzzle_id_len = read_u32(r)? as usize;
    let mut puzzle_id_bytes = vec![0u8; puzzle_id_len];
    r.read_exact(&mut puzzle_id_bytes)
        .map_err(|e| SnapshotError::Parse(format!("truncated puzzleId: {e}")))?;
    let puzzle_id = String::from_utf8(puzzle_id_bytes)
        .map_err(|e| SnapshotError::Parse(format!("puzzleId is not valid UTF-8: {e}")))?;

    let placement_order = read_placements(r)?;
    let fixed_raw = read_placements(r)?;
    let fixed_placements = fixed_raw
        .into_iter()
        .map(|p| FixedPlacement {
            row: p.row,
            col: p.col,
            piece_id: p.piece_id,
            rotation: p.rotation,
        })
        .collect();

    Ok(Snapshot {
        puzzle_id,
        rows,
        cols,
        timestamp,
        cumulative_time_ms,
        depth,
        placements,
        placement_order,
        unused_piece_ids,
        fixed_placements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            puzzle_id: "p1".to_string(),
            rows: 2,
            cols: 2,
            timestamp: 1_700_000_000,
            cumulative_time_ms: 12_345,
            depth: 2,
            placements: vec![
                SnapshotPlacement {
                    row: 0,
                    col: 0,
                    piece_id: 1,
                    rotation: 0,
                },
                SnapshotPlacement {
                    row: 0,
                    col: 1,
                    piece_id: 2,
                    rotation: 3,
                },
            ],
            placement_order: vec![
                SnapshotPlacement {
                    row: 0,
                    col: 0,
                    piece_id: 1,
                    rotation: 0,
                },
                SnapshotPlacement {
                    row: 0,
                    col: 1,
                    piece_id: 2,
                    rotation: 3,
                },
            ],
            unused_piece_ids: vec![3],
            fixed_placements: vec![],
        }
    }

    #[test]
    fn round_trips_exactly() {
        let snap = sample_snapshot();
        let mut buf = Vec::new();
        write(&mut buf, &snap).unwrap();
        let read_back = read(&mut &buf[..]).unwrap();
        assert_eq!(read_back, snap);
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = [0u8; 4];
        assert!(read(&mut &buf[..]).is_err());
    }
}
