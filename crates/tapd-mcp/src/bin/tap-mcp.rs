//! tap-mcp - MCP stdio server for mobile UI automation
//!
//! This binary is intended to be launched by an agent harness as an MCP
//! server. Configuration comes from the environment:
//!
//! - `TAPD_HOME`: state directory (default `~/.tapd`)
//! - `TAPD_PLATFORM`: `ios` or `android` (default `ios`)
//! - `TAPD_DEVICE`: simulator UDID / adb serial (default `booted` on
//!   iOS, `emulator-5554` on Android)
//! - `TAPD_APP`: bundle id / package name of the app under automation
//! - `RUST_LOG` / `TAPD_LOG_LEVEL`: log filter (default `warn`)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};

use tapd_core::{FsSnapshotStore, Platform};
use tapd_mcp::adapters::{AdbAdapter, DeviceAdapter, IdbAdapter};
use tapd_mcp::{McpServer, TapdHandler};

fn default_tapd_home() -> PathBuf {
    if let Ok(home) = std::env::var("TAPD_HOME") {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .map(|h| h.join(".tapd"))
        .unwrap_or_else(|| PathBuf::from(".tapd"))
}

fn log_filter() -> tracing_subscriber::EnvFilter {
    let level = if let Ok(v) = std::env::var("RUST_LOG") {
        v
    } else if let Ok(v) = std::env::var("TAPD_LOG_LEVEL") {
        match v.as_str() {
            "silent" => "off".to_string(),
            other => other.to_string(),
        }
    } else {
        "warn".to_string()
    };

    tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
}

fn adapter_from_env() -> Result<Arc<dyn DeviceAdapter>> {
    let platform = std::env::var("TAPD_PLATFORM").unwrap_or_else(|_| "ios".to_string());
    let Some(platform) = Platform::from_str(&platform) else {
        bail!("TAPD_PLATFORM must be 'ios' or 'android', got {:?}", platform);
    };

    let adapter: Arc<dyn DeviceAdapter> = match platform {
        Platform::Ios => {
            let device = std::env::var("TAPD_DEVICE").unwrap_or_else(|_| "booted".to_string());
            Arc::new(IdbAdapter::new(device))
        }
        Platform::Android => {
            let device =
                std::env::var("TAPD_DEVICE").unwrap_or_else(|_| "emulator-5554".to_string());
            Arc::new(AdbAdapter::new(device))
        }
    };
    Ok(adapter)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let home = default_tapd_home();
    let adapter = adapter_from_env()?;
    let app_id = std::env::var("TAPD_APP").unwrap_or_default();

    let session_dir = home.join("sessions").join(adapter.device_id());
    let store = Arc::new(FsSnapshotStore::new(session_dir));
    let runs_dir = home.join("runs");

    let handler = TapdHandler::new(adapter, store, runs_dir, app_id);
    let mut server = McpServer::new(handler);
    server.run().await
}
