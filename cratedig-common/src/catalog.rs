//! Catalog model for ccMixter upload records
//!
//! The catalog is a line-delimited JSON file, one upload per line, produced by
//! the metadata fetch step. Records carry more fields than we model; serde
//! ignores the rest. Malformed lines are logged and skipped so one bad record
//! never sinks the whole catalog.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use tracing::warn;

/// One file attached to an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name as published by the origin
    pub file_name: String,

    /// File size in bytes (absent for some older records)
    #[serde(default)]
    pub file_filesize: Option<u64>,

    /// Format metadata (extension, mime type, ...)
    #[serde(default)]
    pub file_format_info: Option<FileFormatInfo>,

    /// Direct download URL (absent when the origin withholds the file)
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Format metadata for a file entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileFormatInfo {
    /// Canonical extension, e.g. "mp3"
    #[serde(rename = "default-ext", default)]
    pub default_ext: Option<String>,
}

impl FileEntry {
    /// True when the format info or the file name identifies this as MP3
    pub fn is_mp3(&self) -> bool {
        if let Some(info) = &self.file_format_info {
            if info.default_ext.as_deref() == Some("mp3") {
                return true;
            }
        }
        self.file_name.ends_with(".mp3")
    }
}

/// One catalog record (a ccMixter upload)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    /// Numeric upload id, unique within the catalog
    pub upload_id: u64,

    /// Display name
    pub upload_name: String,

    /// Artist display name
    #[serde(default)]
    pub user_real_name: Option<String>,

    /// Arbitrary extra metadata (tags, bpm, ...)
    #[serde(default)]
    pub upload_extra: HashMap<String, Value>,

    /// Files attached to this upload
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

impl Upload {
    /// First MP3 file of this upload, with its index
    ///
    /// Prefers the format-info extension, falls back to the file-name suffix.
    pub fn first_mp3(&self) -> Option<(usize, &FileEntry)> {
        self.files.iter().enumerate().find(|(_, f)| f.is_mp3())
    }
}

/// Load the catalog from a JSONL file
///
/// Malformed lines are skipped with a warning; blank lines are ignored.
pub fn load_catalog(path: &Path) -> Result<Vec<Upload>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut uploads = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Upload>(&line) {
            Ok(upload) => uploads.push(upload),
            Err(e) => {
                warn!("Skipping malformed catalog line {}: {}", line_no + 1, e);
            }
        }
    }
    Ok(uploads)
}

/// Find an upload by id
pub fn find_upload(uploads: &[Upload], upload_id: u64) -> Option<&Upload> {
    uploads.iter().find(|u| u.upload_id == upload_id)
}

/// Selected-file pointer within a multi-file upload
///
/// Cycling wraps in both directions. The UI moves the cursor freely; whether a
/// move re-issues a play request is the UI's play-mode decision, not ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileCursor {
    index: usize,
    len: usize,
}

impl FileCursor {
    /// Cursor over `len` files, starting at index 0
    ///
    /// Returns `None` for an upload with no files.
    pub fn new(len: usize) -> Option<Self> {
        if len == 0 {
            None
        } else {
            Some(Self { index: 0, len })
        }
    }

    /// Current index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Advance to the next file, wrapping past the end
    pub fn next(&mut self) -> usize {
        self.index = (self.index + 1) % self.len;
        self.index
    }

    /// Step to the previous file, wrapping before the start
    pub fn prev(&mut self) -> usize {
        self.index = (self.index + self.len - 1) % self.len;
        self.index
    }
}
