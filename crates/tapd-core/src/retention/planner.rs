//! Run retention planning
//!
//! Computes a keep/delete partition over accumulated run directories
//! under combined count, age, and size constraints. Two tiers: protect
//! first (newest N, recent failures), then let byte pressure override
//! protection, but never before every unprotected run is gone. The
//! oldest-first order inside each tier is what keeps deletion
//! deterministic.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Provenance of a run's `startedAt` timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartedAtSource {
    /// Parsed from a timestamp stamp in the directory name.
    Name,
    /// Fell back to the directory's filesystem mtime.
    Mtime,
}

/// One run directory as seen by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub started_at_source: StartedAtSource,
    /// Directory mtime at scan time; the executor re-checks this before
    /// deleting.
    pub mtime_ms: i64,
    /// Run outcome from result.json: `Some(true)` success, `Some(false)`
    /// failure, `None` unknown.
    pub ok: Option<bool>,
    pub size_bytes: u64,
}

/// Retention policy knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcPolicy {
    /// Always keep this many most-recent runs, regardless of outcome.
    pub keep_last: usize,
    /// Additionally keep failed-or-unknown runs younger than this.
    pub keep_failure_days: i64,
    /// Total byte budget across all retained runs.
    pub max_bytes: u64,
}

impl Default for GcPolicy {
    fn default() -> Self {
        GcPolicy {
            keep_last: 5,
            keep_failure_days: 7,
            max_bytes: 1024 * 1024 * 1024,
        }
    }
}

/// A computed keep/delete partition. Pure value; applying it is a
/// separate, explicit step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcPlan {
    pub keep_last: usize,
    pub keep_failure_days: i64,
    pub max_bytes: u64,
    pub total_runs: usize,
    pub total_bytes: u64,
    pub keep: Vec<RunInfo>,
    /// Deletions in the order chosen: unprotected oldest-first, then
    /// (only under byte pressure) protected oldest-first.
    pub delete: Vec<RunInfo>,
    pub after_bytes: u64,
}

/// Compute the retention plan. `now` is passed in so the result is a
/// pure function of its inputs.
pub fn plan(mut runs: Vec<RunInfo>, policy: &GcPolicy, now: DateTime<Utc>) -> GcPlan {
    // Newest-first; dir path as tie-break so equal timestamps still
    // order deterministically.
    runs.sort_by(|a, b| {
        b.started_at
            .cmp(&a.started_at)
            .then_with(|| a.dir.cmp(&b.dir))
    });

    let total_runs = runs.len();
    let total_bytes: u64 = runs.iter().map(|r| r.size_bytes).sum();
    let failure_window = Duration::days(policy.keep_failure_days);

    // Union of the two keep rules; a run protected by both counts once.
    let protected: Vec<bool> = runs
        .iter()
        .enumerate()
        .map(|(i, run)| {
            i < policy.keep_last
                || (run.ok != Some(true) && now - run.started_at <= failure_window)
        })
        .collect();

    let mut after_bytes = total_bytes;
    let mut delete_idx: Vec<usize> = Vec::new();

    // Everything outside the keep set goes, oldest first.
    for i in (0..runs.len()).rev() {
        if !protected[i] {
            after_bytes -= runs[i].size_bytes;
            delete_idx.push(i);
        }
    }

    // Byte pressure may then eat into the protected set, oldest first.
    if after_bytes > policy.max_bytes {
        for i in (0..runs.len()).rev() {
            if after_bytes <= policy.max_bytes {
                break;
            }
            if protected[i] {
                after_bytes -= runs[i].size_bytes;
                delete_idx.push(i);
            }
        }
    }

    let deleted: HashSet<usize> = delete_idx.iter().copied().collect();
    GcPlan {
        keep_last: policy.keep_last,
        keep_failure_days: policy.keep_failure_days,
        max_bytes: policy.max_bytes,
        total_runs,
        total_bytes,
        keep: runs
            .iter()
            .enumerate()
            .filter(|(i, _)| !deleted.contains(i))
            .map(|(_, r)| r.clone())
            .collect(),
        delete: delete_idx.iter().map(|&i| runs[i].clone()).collect(),
        after_bytes,
    }
}
