//! tapd-core: canonical UI model and retention policy for tapd
//!
//! This crate holds the two subsystems that do real algorithmic work:
//!
//! - **UI snapshot canonicalization & selector resolution**: two
//!   platform parsers (iOS accessibility JSON, Android uiautomator XML)
//!   feeding one canonical element model with per-snapshot ref handles,
//!   plus the four-form selector grammar (`@e<N>`, `coords:<x>,<y>`,
//!   `text:"…"`, `id:"…"`) resolved back to a concrete tap point.
//! - **Run artifact retention**: a deterministic plan/execute GC over
//!   run directories balancing "keep the newest N" against a byte
//!   budget, with a race-safe deletion order.
//!
//! Everything here is synchronous and, apart from the snapshot store's
//! overwrite and the retention executor's deletes, side-effect-free.
//! Subprocess invocation, device control, and the MCP surface live in
//! `tapd-mcp`.

pub mod error;
pub mod retention;
pub mod selector;
pub mod snapshot;
pub mod store;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use retention::{
    dir_mtime_ms, execute_plan, plan, scan_runs, GcOutcome, GcPlan, GcPolicy, RunInfo,
    StartedAtSource,
};
pub use selector::{parse_selector_token, resolve, resolve_token, ParsedSelector};
pub use snapshot::{build_snapshot, parse_android_dump, parse_ios_dump, render_tree};
pub use store::{FsSnapshotStore, SnapshotStore};
pub use types::{
    is_interactive_role, AndroidSelectors, Bounds, CanonicalElement, ElementStates, IosSelectors,
    ParsedElement, Platform, ResolvedTarget, Selectors, UISnapshot, DEFAULT_STALE_AFTER_SECS,
    INTERACTIVE_ROLES,
};
