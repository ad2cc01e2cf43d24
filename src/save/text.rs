//! Human-readable snapshot format (spec §4.11).
//!
//! Header block of `# key: value` lines, then three `# <Name>` sections
//! ("Fixed Pieces", "Placement Order", "Placements") of `row,col pieceId
//! rotation` lines, then a final "Unused pieces" section listing ids.
//! Comments (`#`) are ignored except for recognized header keys.

use std::io::{self, BufRead, Write};

use crate::error::SnapshotError;
use crate::puzzle::FixedPlacement;

use super::snapshot::{Snapshot, SnapshotPlacement};

pub fn write<W: Write>(w: &mut W, snap: &Snapshot) -> io::Result<()> {
    writeln!(w, "# Timestamp: {}", snap.timestamp)?;
    writeln!(w, "# Puzzle: {}", snap.puzzle_id)?;
    writeln!(w, "# Dimensions: {}x{}", snap.rows, snap.cols)?;
    writeln!(w, "# Depth: {}", snap.depth)?;
    writeln!(w, "# TotalComputeTime: {}", snap.cumulative_time_ms)?;
    writeln!(w)?;

    writeln!(w, "# Fixed Pieces")?;
    for f in &snap.fixed_placements {
        writeln!(w, "{},{} {} {}", f.row, f.col, f.piece_id, f.rotation)?;
    }
    writeln!(w)?;

    writeln!(w, "# Placement Order")?;
    for p in &snap.placement_order {
        writeln!(w, "{},{} {} {}", p.row, p.col, p.piece_id, p.rotation)?;
    }
    writeln!(w)?;

    writeln!(w, "# Placements")?;
    for p in &snap.placements {
        writeln!(w, "{},{} {} {}", p.row, p.col, p.piece_id, p.rotation)?;
    }
    writeln!(w)?;

    writeln!(w, "# Unused pieces")?;
    let unused: Vec<String> = snap.unused_piece_ids.iter().map(u32::to_string).collect();
    writeln!(w, "{}", unused.join(" "))?;

    Ok(())
}

#[derive(Default)]
struct Header {
    timestamp: u64,
    puzzle_id: String,
    rows: usize,
    cols: usize,
    depth: usize,
    cumulative_time_ms: u64,
}

fn parse_placement_line(line: &str) -> Result<SnapshotPlacement, SnapshotError> {
    let mut parts = line.split_whitespace();
    let coord = parts
        .next()
        .ok_or_else(|| SnapshotError::Parse(format!("missing coord in line `{line}`")))?;
    let piece_id = parts
        .next()
        .ok_or_else(|| SnapshotError::Parse(format!("missing pieceId in line `{line}`")))?
        .parse::<u32>()
        .map_err(|e| SnapshotError::Parse(format!("bad pieceId in `{line}`: {e}")))?;
    let rotation = parts
        .next()
        .ok_or_else(|| SnapshotError::Parse(format!("missing rotation in line `{line}`")))?
        .parse::<u8>()
        .map_err(|e| SnapshotError::Parse(format!("bad rotation in `{line}`: {e}")))?;

    let (row_str, col_str) = coord
        .split_once(',')
        .ok_or_else(|| SnapshotError::Parse(format!("bad coord in `{line}`")))?;
    let row = row_str
        .parse::<usize>()
        .map_err(|e| SnapshotError::Parse(format!("bad row in `{line}`: {e}")))?;
    let col = col_str
        .parse::<usize>()
        .map_err(|e| SnapshotError::Parse(format!("bad col in `{line}`: {e}")))?;

    Ok(SnapshotPlacement {
        row,
        col,
        piece_id,
        rotation,
    })
}

pub fn read<R: BufRead>(r: R) -> Result<Snapshot, SnapshotError> {
    let mut header = Header::default();
    let mut section: Option<&'static str> = None;
    let mut fixed_placements = Vec::new();
    let mut placement_order = Vec::new();
    let mut placements = Vec::new();
    let mut unused_piece_ids = Vec::new();

    for line in r.lines() {
        let line = line.map_err(|e| SnapshotError::Parse(format!("I/O error: {e}")))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('#') {
            let rest = rest.trim();
            if let Some(value) = rest.strip_prefix("Timestamp:") {
                header.timestamp = value.trim().parse().unwrap_or(0);
            } else if let Some(value) = rest.strip_prefix("Puzzle:") {
                header.puzzle_id = value.trim().to_string();
            } else if let Some(value) = rest.strip_prefix("Dimensions:") {
                if let Some((r, c)) = value.trim().split_once('x') {
                    header.rows = r.trim().parse().unwrap_or(0);
                    header.cols = c.trim().parse().unwrap_or(0);
                }
            } else if let Some(value) = rest.strip_prefix("Depth:") {
                header.depth = value.trim().parse().unwrap_or(0);
            } else if let Some(value) = rest.strip_prefix("TotalComputeTime:") {
                header.cumulative_time_ms = value.trim().parse().unwrap_or(0);
            } else if rest == "Fixed Pieces" {
                section = Some("fixed");
            } else if rest == "Placement Order" {
                section = Some("order");
            } else if rest == "Placements" {
                section = Some("placements");
            } else if rest == "Unused pieces" {
                section = Some("unused");
            }
            // unrecognized comment lines are ignored
            continue;
        }

        match section {
            Some("fixed") => {
                let p = parse_placement_line(trimmed)?;
                fixed_placements.push(FixedPlacement {
                    row: p.row,
                    col: p.col,
                    piece_id: p.piece_id,
                    rotation: p.rotation,
                });
            }
            Some("order") => placement_order.push(parse_placement_line(trimmed)?),
            Some("placements") => placements.push(parse_placement_line(trimmed)?),
            Some("unused") => {
                for tok in trimmed.split_whitespace() {
                    unused_piece_ids.push(
                        tok.parse::<u32>()
                            .map_err(|e| SnapshotError::Parse(format!("bad unused id `{tok}`: {e}")))?,
                    );
                }
            }
            _ => {}
        }
    }

    Ok(Snapshot {
        puzzle_id: header.puzzle_id,
        rows: header.rows,
        cols: header.cols,
        timestamp: header.timestamp,
        cumulative_time_ms: header.cumulative_time_ms,
        depth: header.depth,
        placements,
        placement_order,
        unused_piece_ids,
        fixed_placements,
    })
}
