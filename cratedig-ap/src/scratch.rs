//! Scratch storage for the single in-flight download
//!
//! A process-lifetime temporary directory holding the one live download.
//! Each fetch writes to its own generation-numbered file, so a superseded
//! worker that has not yet observed its cancellation flag can only ever
//! touch its own file, never the successor's; a dying worker's partial may
//! briefly coexist with the live file before that worker cleans it up. The
//! directory itself is removed when the engine is dropped. A crash before
//! cleanup leaks one stray directory in the system temp folder, which is
//! accepted.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Process-lifetime scratch directory
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create the scratch directory
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        debug!("Scratch directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Scratch file path for the fetch of `generation`
    pub fn file_for(&self, generation: u64) -> PathBuf {
        self.dir.path().join(format!("current-{}.mp3", generation))
    }

    /// Remove one scratch file if present, best-effort
    pub fn remove(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed scratch file {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Could not remove scratch file {}: {}", path.display(), e),
        }
    }

    /// Remove every file in the scratch directory, best-effort
    pub fn clear(&self) {
        let entries = match std::fs::read_dir(self.dir.path()) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Could not list scratch directory: {}", e);
                return;
            }
        };
        for entry in entries.flatten() {
            self.remove(&entry.path());
        }
    }
}
