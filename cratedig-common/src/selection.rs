//! Selection persistence
//!
//! The selection file records the curated subset: one upload id per line,
//! newline-terminated, no header. The whole file is rewritten (sorted) on
//! every toggle so the on-disk state always matches the in-memory set.

use crate::{Error, Result};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// In-memory selection set backed by the selection file
#[derive(Debug)]
pub struct SelectionStore {
    path: PathBuf,
    ids: BTreeSet<u64>,
}

impl SelectionStore {
    /// Load the selection from `path`
    ///
    /// A missing file is an empty selection, not an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut ids = BTreeSet::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let id: u64 = line.parse().map_err(|_| {
                    Error::InvalidInput(format!("bad selection line: {:?}", line))
                })?;
                ids.insert(id);
            }
        }

        Ok(Self { path, ids })
    }

    /// True when `upload_id` is selected
    pub fn contains(&self, upload_id: u64) -> bool {
        self.ids.contains(&upload_id)
    }

    /// Flip membership of `upload_id` and persist
    ///
    /// Returns the new membership state (true = now selected).
    pub fn toggle(&mut self, upload_id: u64) -> Result<bool> {
        let selected = if self.ids.remove(&upload_id) {
            false
        } else {
            self.ids.insert(upload_id);
            true
        };
        self.save()?;
        Ok(selected)
    }

    /// Rewrite the selection file in full, ids sorted ascending
    pub fn save(&self) -> Result<()> {
        let mut file = std::fs::File::create(&self.path)?;
        for id in &self.ids {
            writeln!(file, "{}", id)?;
        }
        Ok(())
    }

    /// Number of selected uploads
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when nothing is selected
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.iter().copied()
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
