//! Local detection history.
//!
//! After a successful run the binary appends one record per snapshot to a
//! JSON history file, keeping only the newest entries. The file is a
//! convenience log for local inspection; it is not the system of record
//! (the caller persists the full report), so a corrupt or missing file is
//! replaced rather than treated as an error.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::report::{Report, SnapshotRecord};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    /// Basename of the processed video.
    pub video: String,
    /// Wall-clock seconds since epoch when the record was written.
    pub recorded_epoch_s: u64,
    pub snapshot: SnapshotRecord,
    /// Position of the sighting within the video, in seconds.
    pub detected_at: f64,
}

/// Append the run's snapshots to the history file at `path`, truncating to
/// the newest `limit` entries. Runs with no snapshots leave the file alone.
pub fn append(path: &Path, report: &Report, limit: usize) -> Result<usize> {
    if report.snapshots.is_empty() {
        return Ok(0);
    }

    let mut entries = load_or_empty(path);
    let video = Path::new(&report.video.path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.video.path.clone());
    let recorded = now_s()?;

    let mut next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
    for snapshot in &report.snapshots {
        entries.push(HistoryEntry {
            id: next_id,
            video: video.clone(),
            recorded_epoch_s: recorded,
            snapshot: snapshot.clone(),
            detected_at: snapshot.timestamp,
        });
        next_id += 1;
    }

    if entries.len() > limit {
        entries.drain(..entries.len() - limit);
    }

    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(path, json)
        .with_context(|| format!("writing detection history to {}", path.display()))?;

    Ok(report.snapshots.len())
}

/// Read the history file, tolerating absence and corruption.
pub fn load_or_empty(path: &Path) -> Vec<HistoryEntry> {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!(
                "history: {} is not valid history JSON ({}), starting fresh",
                path.display(),
                e
            );
            Vec::new()
        }
    }
}

fn now_s() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}
