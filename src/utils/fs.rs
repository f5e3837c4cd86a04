//! Whole-file atomic replacement and stat helpers

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use crate::error::{Error, IoResultExt, Result};
use crate::parsers::deserializers::truncate_to_millis;

/// Replace `path` with `contents` so readers see either the old or the new file
///
/// Writes a sibling temp file, flushes it to disk and renames it over the target.
/// An existing file's permissions carry over to the replacement.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).at(parent)?;
    tmp.write_all(contents).at(tmp.path())?;
    tmp.as_file().sync_all().at(tmp.path())?;

    if let Ok(existing) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), existing.permissions()).at(tmp.path())?;
    }

    tmp.persist(path).map_err(|e| Error::Io { path: path.to_path_buf(), source: e.error })?;
    Ok(())
}

/// What the reconciler needs to know about a file without reading it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    /// Millisecond precision, matching what the index stores
    pub modified: DateTime<Utc>,
    /// Birth time where the platform has one, else the modification time
    pub created: DateTime<Utc>,
}

impl FileStat {
    pub fn of(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).at(path)?;
        let modified = metadata.modified().at(path)?;
        let created = metadata.created().unwrap_or(modified);
        Ok(Self {
            size: metadata.len(),
            modified: truncate_to_millis(DateTime::<Utc>::from(modified)),
            created: truncate_to_millis(DateTime::<Utc>::from(created)),
        })
    }
}

/// Non-empty lines in a file, an upper bound on its message count
pub fn count_nonempty_lines(path: &Path) -> Result<u64> {
    let bytes = fs::read(path).at(path)?;
    Ok(bytes
        .split(|b| *b == b'\n')
        .filter(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
        .count() as u64)
}
