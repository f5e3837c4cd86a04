//! Index persistence: self-healing load, atomic save, locked read-modify-write

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::lock::with_project_lock;
use crate::error::Result;
use crate::models::{INDEX_VERSION, IndexEntry, SessionsIndex};
use crate::utils::{index_path, write_atomically};

/// What was found on disk when the index was loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    Present,
    Absent,
    /// Unreadable, or not a JSON object; loaded as empty
    Corrupt,
}

/// Load a project's index, reporting whether it existed and parsed
///
/// The index is a cache, so an unreadable file or invalid JSON yields an empty
/// index instead of an error; the next save replaces it. Valid JSON is kept as
/// far as it fits the schema: entries that don't are skipped one by one.
pub fn load_index_with_state(project_dir: &Path) -> (SessionsIndex, IndexState) {
    let path = index_path(project_dir);

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return (SessionsIndex::default(), IndexState::Absent);
        }
        Err(e) => {
            warn!("Cannot read {}, treating it as corrupt: {}", path.display(), e);
            return (SessionsIndex::default(), IndexState::Corrupt);
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(fields)) => (index_from_fields(fields, &path), IndexState::Present),
        Ok(_) => {
            warn!("Index {} is not a JSON object, it will be regenerated", path.display());
            (SessionsIndex::default(), IndexState::Corrupt)
        }
        Err(e) => {
            warn!("Malformed index {}, it will be regenerated: {}", path.display(), e);
            (SessionsIndex::default(), IndexState::Corrupt)
        }
    }
}

fn index_from_fields(mut fields: Map<String, Value>, path: &Path) -> SessionsIndex {
    let version = match fields.remove("version") {
        None => INDEX_VERSION,
        Some(value) => value.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or_else(|| {
            warn!("Unexpected version {} in {}, using {}", value, path.display(), INDEX_VERSION);
            INDEX_VERSION
        }),
    };

    let raw_entries = match fields.remove("entries") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            warn!("Ignoring non-array entries in {}: {}", path.display(), other);
            Vec::new()
        }
    };
    let entries = raw_entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, raw)| match serde_json::from_value::<IndexEntry>(raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping entry {} of {}: {}", i, path.display(), e);
                None
            }
        })
        .collect();

    SessionsIndex { version, entries, extra: fields }
}

pub fn load_index(project_dir: &Path) -> SessionsIndex {
    load_index_with_state(project_dir).0
}

/// Serialize with stable field order and replace the file atomically
pub fn save_index(project_dir: &Path, index: &SessionsIndex) -> Result<()> {
    let path = index_path(project_dir);
    let json = serde_json::to_vec_pretty(index)?;
    write_atomically(&path, &json)?;
    debug!("Saved {} ({} entries)", path.display(), index.entries.len());
    Ok(())
}

/// Locked read-modify-write of a project's index
///
/// `f` sees the freshly loaded index and its state. The file is written only if
/// `f` changed something, or if the file on disk was corrupt.
pub fn update_index<R>(
    project_dir: &Path,
    f: impl FnOnce(&mut SessionsIndex, IndexState) -> Result<R>,
) -> Result<R> {
    with_project_lock(project_dir, || {
        let (mut index, state) = load_index_with_state(project_dir);
        let before = index.clone();
        let result = f(&mut index, state)?;
        if index != before || state == IndexState::Corrupt {
            save_index(project_dir, &index)?;
        }
        Ok(result)
    })
}
