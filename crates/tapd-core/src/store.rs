//! Latest-snapshot persistence
//!
//! One snapshot per session, overwritten wholesale on each `snapshot`
//! action. The core only needs "read most recent snapshot or none" and
//! "overwrite latest snapshot", so the storage backend is an injected
//! seam rather than a hardwired file layout.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::types::UISnapshot;

/// Storage seam for the session's latest snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Read the most recent snapshot, or `None` if no snapshot was taken
    /// yet this session.
    fn load(&self) -> CoreResult<Option<UISnapshot>>;

    /// Overwrite the latest snapshot.
    fn save(&self, snapshot: &UISnapshot) -> CoreResult<()>;
}

/// Filesystem-backed store: a single JSON file per session directory.
pub struct FsSnapshotStore {
    path: PathBuf,
}

impl FsSnapshotStore {
    /// Store the snapshot at `dir/snapshot.json`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        FsSnapshotStore {
            path: dir.as_ref().join("snapshot.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn load(&self) -> CoreResult<Option<UISnapshot>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: UISnapshot = serde_json::from_str(&raw).map_err(|e| {
            CoreError::InvalidSnapshot(format!("{}: {}", self.path.display(), e))
        })?;

        // Shape check: a file that deserializes but whose refs no longer
        // invert the element list is unusable for addressing.
        if !snapshot.validate() {
            return Err(CoreError::InvalidSnapshot(format!(
                "{}: refs are not the inverse index of elements",
                self.path.display()
            )));
        }

        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &UISnapshot) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crashed write never leaves a truncated
        // snapshot behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&tmp, &self.path)?;

        debug!(
            snapshot_id = %snapshot.snapshot_id,
            elements = snapshot.elements.len(),
            path = %self.path.display(),
            "snapshot saved"
        );
        Ok(())
    }
}
