//! Retention plan execution
//!
//! Applies a computed plan with a re-validation step per directory:
//! anything that disappeared or was touched after planning is skipped as
//! a benign race, never reported as an error. A dry run never reaches
//! this module at all.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::{debug, warn};

use super::planner::GcPlan;

/// What actually happened when a plan was applied.
#[derive(Debug, Clone, Default)]
pub struct GcOutcome {
    pub deleted: Vec<PathBuf>,
    /// Directories skipped because they vanished or changed since
    /// planning.
    pub skipped: Vec<PathBuf>,
    pub freed_bytes: u64,
}

/// Directory mtime in epoch milliseconds, matching the value recorded in
/// `RunInfo` at scan time.
pub fn dir_mtime_ms(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let ms = modified.duration_since(UNIX_EPOCH).ok()?.as_millis();
    Some(ms as i64)
}

/// Apply a plan's deletions.
///
/// Per planned deletion: re-stat the directory; if it no longer exists,
/// skip (already gone); if its mtime drifted from the planned value,
/// skip (something touched it after planning); otherwise delete
/// recursively.
pub fn execute_plan(plan: &GcPlan) -> GcOutcome {
    let mut outcome = GcOutcome::default();

    for run in &plan.delete {
        let Some(current_mtime) = dir_mtime_ms(&run.dir) else {
            debug!(dir = %run.dir.display(), "run dir already gone, skipping");
            outcome.skipped.push(run.dir.clone());
            continue;
        };

        if current_mtime != run.mtime_ms {
            debug!(
                dir = %run.dir.display(),
                planned = run.mtime_ms,
                current = current_mtime,
                "run dir changed since planning, skipping"
            );
            outcome.skipped.push(run.dir.clone());
            continue;
        }

        match fs::remove_dir_all(&run.dir) {
            Ok(()) => {
                debug!(dir = %run.dir.display(), bytes = run.size_bytes, "run dir deleted");
                outcome.freed_bytes += run.size_bytes;
                outcome.deleted.push(run.dir.clone());
            }
            Err(e) => {
                // Concurrent cleanup can also remove it mid-delete.
                warn!(dir = %run.dir.display(), error = %e, "run dir deletion failed, skipping");
                outcome.skipped.push(run.dir.clone());
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::planner::{GcPolicy, RunInfo, StartedAtSource};
    use chrono::Utc;

    fn plan_for(runs: Vec<RunInfo>) -> GcPlan {
        // keep nothing: every run lands in the delete list
        let policy = GcPolicy {
            keep_last: 0,
            keep_failure_days: 0,
            max_bytes: 0,
        };
        crate::retention::planner::plan(runs, &policy, Utc::now())
    }

    fn run_for_dir(dir: &Path, size: u64) -> RunInfo {
        RunInfo {
            dir: dir.to_path_buf(),
            started_at: Utc::now(),
            started_at_source: StartedAtSource::Mtime,
            mtime_ms: dir_mtime_ms(dir).unwrap_or(0),
            ok: Some(true),
            size_bytes: size,
        }
    }

    #[test]
    fn test_deletes_planned_dirs() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("run-1");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("log.txt"), "hello").unwrap();

        let plan = plan_for(vec![run_for_dir(&dir, 5)]);
        let outcome = execute_plan(&plan);

        assert!(!dir.exists());
        assert_eq!(outcome.deleted, vec![dir]);
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.freed_bytes, 5);
    }

    #[test]
    fn test_skips_missing_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("already-gone");

        let info = RunInfo {
            dir: dir.clone(),
            started_at: Utc::now(),
            started_at_source: StartedAtSource::Mtime,
            mtime_ms: 12345,
            ok: Some(true),
            size_bytes: 10,
        };

        let plan = plan_for(vec![info]);
        let outcome = execute_plan(&plan);

        assert!(outcome.deleted.is_empty());
        assert_eq!(outcome.skipped, vec![dir]);
        assert_eq!(outcome.freed_bytes, 0);
    }

    #[test]
    fn test_skips_on_mtime_drift() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("run-1");
        fs::create_dir(&dir).unwrap();

        let mut info = run_for_dir(&dir, 10);
        info.mtime_ms -= 1000; // planned value no longer matches

        let plan = plan_for(vec![info]);
        let outcome = execute_plan(&plan);

        assert!(dir.exists());
        assert!(outcome.deleted.is_empty());
        assert_eq!(outcome.skipped, vec![dir]);
    }
}
