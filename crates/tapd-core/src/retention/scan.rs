//! Run directory scanning
//!
//! Builds the `RunInfo` listing the planner consumes: one entry per run
//! directory with its outcome, size, and a startedAt timestamp derived
//! from the directory name when possible, falling back to mtime.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::executor::dir_mtime_ms;
use super::planner::{RunInfo, StartedAtSource};
use crate::error::CoreResult;

/// Run directories carry a `YYYYMMDD-HHMMSS` stamp somewhere in the
/// name (e.g. `run-20250807-142311`).
static NAME_STAMP_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{8}-\d{6})").unwrap());

/// The optional per-run outcome file. Extra fields are tolerated.
#[derive(Debug, Deserialize)]
struct RunResult {
    ok: bool,
}

/// Scan `root` for run directories.
///
/// A missing root is an empty listing, not an error. The returned list
/// is sorted newest-first by startedAt.
pub fn scan_runs(root: &Path) -> CoreResult<Vec<RunInfo>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut runs = Vec::new();
    for entry in entries {
        let entry = entry?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }

        let mtime_ms = dir_mtime_ms(&dir).unwrap_or(0);
        let name = entry.file_name().to_string_lossy().to_string();

        let (started_at, started_at_source) = match stamp_from_name(&name) {
            Some(ts) => (ts, StartedAtSource::Name),
            None => (
                DateTime::from_timestamp_millis(mtime_ms).unwrap_or_else(Utc::now),
                StartedAtSource::Mtime,
            ),
        };

        runs.push(RunInfo {
            ok: read_outcome(&dir),
            size_bytes: dir_size(&dir),
            dir,
            started_at,
            started_at_source,
            mtime_ms,
        });
    }

    runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    debug!(root = %root.display(), runs = runs.len(), "scanned run directories");
    Ok(runs)
}

fn stamp_from_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = NAME_STAMP_PATTERN.find(name)?.as_str();
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%d-%H%M%S").ok()?;
    Some(naive.and_utc())
}

fn read_outcome(dir: &Path) -> Option<bool> {
    let raw = fs::read_to_string(dir.join("result.json")).ok()?;
    let result: RunResult = serde_json::from_str(&raw).ok()?;
    Some(result.ok)
}

/// Recursive size of everything under the run directory. Unreadable
/// entries count as zero.
fn dir_size(dir: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                dir_size(&path)
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            }
        })
        .sum()
}
