//! Device adapters
//!
//! Thin subprocess wrappers around the platform automation CLIs. The
//! handler only sees the `DeviceAdapter` trait; everything platform- and
//! process-specific stays here.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use tapd_core::Platform;

/// Raw accessibility payload as produced by the native tool, before any
/// canonicalization.
#[derive(Debug, Clone)]
pub enum RawDump {
    /// Arbitrary JSON graph from the iOS accessibility tool.
    Ios(Value),
    /// uiautomator XML text.
    Android(String),
}

/// Seam between the tool handler and the device. Implementations invoke
/// the native tools; the core never sees platform formats beyond the raw
/// dump handed to its parsers.
#[async_trait::async_trait]
pub trait DeviceAdapter: Send + Sync {
    fn platform(&self) -> Platform;
    fn device_id(&self) -> &str;

    /// Dump the current accessibility hierarchy.
    async fn dump_ui(&self) -> Result<RawDump>;

    /// Tap at a point in platform-native pixel coordinates.
    async fn tap(&self, x: i64, y: i64) -> Result<()>;

    /// Type text into the currently focused element.
    async fn type_text(&self, text: &str) -> Result<()>;
}

async fn run_capture(program: &str, args: &[&str]) -> Result<String> {
    debug!(%program, ?args, "exec");
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("Failed to spawn {}", program))?;

    if !output.status.success() {
        bail!(
            "{} {:?} failed ({}): {}",
            program,
            args,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// iOS Simulator adapter driving `idb`.
pub struct IdbAdapter {
    device_id: String,
}

impl IdbAdapter {
    pub fn new(device_id: impl Into<String>) -> Self {
        IdbAdapter {
            device_id: device_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl DeviceAdapter for IdbAdapter {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn dump_ui(&self) -> Result<RawDump> {
        let raw = run_capture(
            "idb",
            &["ui", "describe-all", "--udid", &self.device_id, "--json"],
        )
        .await?;
        let value: Value =
            serde_json::from_str(raw.trim()).context("idb returned non-JSON accessibility dump")?;
        Ok(RawDump::Ios(value))
    }

    async fn tap(&self, x: i64, y: i64) -> Result<()> {
        run_capture(
            "idb",
            &[
                "ui",
                "tap",
                "--udid",
                &self.device_id,
                &x.to_string(),
                &y.to_string(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        run_capture("idb", &["ui", "text", "--udid", &self.device_id, text]).await?;
        Ok(())
    }
}

/// Android emulator/device adapter driving `adb`.
pub struct AdbAdapter {
    device_id: String,
}

impl AdbAdapter {
    pub fn new(device_id: impl Into<String>) -> Self {
        AdbAdapter {
            device_id: device_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl DeviceAdapter for AdbAdapter {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn dump_ui(&self) -> Result<RawDump> {
        // exec-out streams the dump without a device-side temp file
        let xml = run_capture(
            "adb",
            &[
                "-s",
                &self.device_id,
                "exec-out",
                "uiautomator",
                "dump",
                "/dev/tty",
            ],
        )
        .await?;
        Ok(RawDump::Android(xml))
    }

    async fn tap(&self, x: i64, y: i64) -> Result<()> {
        run_capture(
            "adb",
            &[
                "-s",
                &self.device_id,
                "shell",
                "input",
                "tap",
                &x.to_string(),
                &y.to_string(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        // `input text` treats spaces as separators
        let escaped = text.replace(' ', "%s");
        run_capture(
            "adb",
            &["-s", &self.device_id, "shell", "input", "text", &escaped],
        )
        .await?;
        Ok(())
    }
}
