//! Tool handler
//!
//! Wires the MCP tool surface to the core: raw dumps from the device
//! adapter flow through the platform parsers into the snapshot store;
//! selector tokens resolve against the stored snapshot into tap points
//! the adapter acts on.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use tapd_core::{
    build_snapshot, execute_plan, parse_android_dump, parse_ios_dump, parse_selector_token, plan,
    resolve, scan_runs, GcPolicy, ParsedSelector, ResolvedTarget, SnapshotStore, UISnapshot,
    DEFAULT_STALE_AFTER_SECS,
};

use crate::adapters::{DeviceAdapter, RawDump};
use crate::server::ToolHandler;
use crate::tools::ToolResult;

pub struct TapdHandler {
    adapter: Arc<dyn DeviceAdapter>,
    store: Arc<dyn SnapshotStore>,
    runs_dir: PathBuf,
    app_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotArgs {
    #[serde(default)]
    interactive_only: bool,
}

#[derive(Debug, Deserialize)]
struct SelectorArgs {
    selector: String,
}

#[derive(Debug, Deserialize)]
struct TypeArgs {
    selector: Option<String>,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcArgs {
    keep_last: Option<usize>,
    keep_failure_days: Option<i64>,
    max_bytes: Option<u64>,
    #[serde(default = "default_dry_run")]
    dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

impl TapdHandler {
    pub fn new(
        adapter: Arc<dyn DeviceAdapter>,
        store: Arc<dyn SnapshotStore>,
        runs_dir: impl Into<PathBuf>,
        app_id: impl Into<String>,
    ) -> Self {
        TapdHandler {
            adapter,
            store,
            runs_dir: runs_dir.into(),
            app_id: app_id.into(),
        }
    }

    async fn ui_snapshot(&self, args: SnapshotArgs) -> anyhow::Result<ToolResult> {
        let elements = match self.adapter.dump_ui().await? {
            RawDump::Ios(payload) => parse_ios_dump(&payload, args.interactive_only),
            RawDump::Android(xml) => parse_android_dump(&xml, args.interactive_only),
        };

        let snapshot = build_snapshot(
            elements,
            self.adapter.platform(),
            self.adapter.device_id(),
            &self.app_id,
        );
        self.store.save(&snapshot)?;

        info!(
            snapshot_id = %snapshot.snapshot_id,
            elements = snapshot.elements.len(),
            "snapshot taken"
        );
        Ok(ToolResult::json(&json!({
            "snapshotId": snapshot.snapshot_id,
            "takenAt": snapshot.taken_at,
            "platform": snapshot.platform,
            "elementCount": snapshot.elements.len(),
            "tree": snapshot.tree,
        })))
    }

    /// Load the session's latest snapshot for ref-based addressing.
    /// Stale snapshots are rejected so agents re-snapshot instead of
    /// tapping through a changed screen.
    fn load_fresh_snapshot(&self) -> anyhow::Result<UISnapshot> {
        let Some(snapshot) = self.store.load()? else {
            anyhow::bail!("no snapshot for this session; run ui_snapshot first");
        };
        let age = snapshot.age(Utc::now());
        if age > chrono::Duration::seconds(DEFAULT_STALE_AFTER_SECS) {
            anyhow::bail!(
                "snapshot is {}s old and may no longer match the screen; re-snapshot",
                age.num_seconds()
            );
        }
        Ok(snapshot)
    }

    /// Resolve a selector token, touching the snapshot only when the
    /// token needs one.
    fn resolve_target(&self, token: &str) -> anyhow::Result<ResolvedTarget> {
        let selector = parse_selector_token(token)?;
        if let ParsedSelector::Coords(x, y) = selector {
            return Ok(ResolvedTarget::Coords {
                x: x.round() as i64,
                y: y.round() as i64,
            });
        }
        let snapshot = self.load_fresh_snapshot()?;
        Ok(resolve(&snapshot, &selector)?)
    }

    async fn ui_tap(&self, args: SelectorArgs) -> anyhow::Result<ToolResult> {
        let target = self.resolve_target(&args.selector)?;
        let (x, y) = target.point();
        self.adapter.tap(x, y).await?;

        info!(selector = %args.selector, x, y, "tapped");
        Ok(ToolResult::json(&tap_report(&args.selector, &target)))
    }

    async fn ui_type(&self, args: TypeArgs) -> anyhow::Result<ToolResult> {
        let mut report = json!({ "typed": args.text });
        if let Some(token) = &args.selector {
            let target = self.resolve_target(token)?;
            let (x, y) = target.point();
            self.adapter.tap(x, y).await?;
            report["focused"] = tap_report(token, &target);
        }
        self.adapter.type_text(&args.text).await?;
        Ok(ToolResult::json(&report))
    }

    async fn ui_describe(&self, args: SelectorArgs) -> anyhow::Result<ToolResult> {
        let target = self.resolve_target(&args.selector)?;
        Ok(ToolResult::json(&target))
    }

    async fn runs_gc(&self, args: GcArgs) -> anyhow::Result<ToolResult> {
        let defaults = GcPolicy::default();
        let policy = GcPolicy {
            keep_last: args.keep_last.unwrap_or(defaults.keep_last),
            keep_failure_days: args.keep_failure_days.unwrap_or(defaults.keep_failure_days),
            max_bytes: args.max_bytes.unwrap_or(defaults.max_bytes),
        };

        let runs = scan_runs(&self.runs_dir)?;
        let gc_plan = plan(runs, &policy, Utc::now());

        if args.dry_run {
            return Ok(ToolResult::json(&json!({
                "dryRun": true,
                "plan": gc_plan,
            })));
        }

        let outcome = execute_plan(&gc_plan);
        info!(
            deleted = outcome.deleted.len(),
            skipped = outcome.skipped.len(),
            freed_bytes = outcome.freed_bytes,
            "run retention applied"
        );
        Ok(ToolResult::json(&json!({
            "dryRun": false,
            "plan": gc_plan,
            "deleted": outcome.deleted,
            "skipped": outcome.skipped,
            "freedBytes": outcome.freed_bytes,
        })))
    }
}

fn tap_report(selector: &str, target: &ResolvedTarget) -> Value {
    match target {
        ResolvedTarget::Coords { x, y } => json!({
            "selector": selector,
            "x": x,
            "y": y,
        }),
        ResolvedTarget::Element { element, x, y } => json!({
            "selector": selector,
            "ref": element.r#ref,
            "role": element.role,
            "name": element.name,
            "x": x,
            "y": y,
        }),
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, ToolResult> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolResult::error(format!("invalid arguments: {}", e)))
}

#[async_trait::async_trait]
impl ToolHandler for TapdHandler {
    async fn call(&self, name: &str, arguments: Value) -> ToolResult {
        let result = match name {
            "ui_snapshot" => match parse_args(arguments) {
                Ok(args) => self.ui_snapshot(args).await,
                Err(e) => return e,
            },
            "ui_tap" => match parse_args(arguments) {
                Ok(args) => self.ui_tap(args).await,
                Err(e) => return e,
            },
            "ui_type" => match parse_args(arguments) {
                Ok(args) => self.ui_type(args).await,
                Err(e) => return e,
            },
            "ui_describe" => match parse_args(arguments) {
                Ok(args) => self.ui_describe(args).await,
                Err(e) => return e,
            },
            "runs_gc" => match parse_args(arguments) {
                Ok(args) => self.runs_gc(args).await,
                Err(e) => return e,
            },
            other => return ToolResult::error(format!("Tool {:?} not implemented", other)),
        };

        result.unwrap_or_else(|e| ToolResult::error(e.to_string()))
    }
}
