//! Field-level patching of index entries

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::models::{IndexEntry, SessionsIndex};
use crate::parsers::deserializers::truncate_to_millis;
use crate::utils::FileStat;

/// Fields to write into an entry; `None` leaves the stored value alone
///
/// `first_prompt` and `git_branch` are doubly optional: `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexEntryPatch {
    pub full_path: Option<PathBuf>,
    pub first_prompt: Option<Option<String>>,
    pub custom_title: Option<String>,
    pub message_count: Option<u64>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub git_branch: Option<Option<String>>,
    pub is_sidechain: Option<bool>,
    pub file_size: Option<u64>,
}

impl IndexEntryPatch {
    pub fn custom_title(title: impl Into<String>) -> Self {
        Self { custom_title: Some(title.into()), ..Self::default() }
    }

    fn apply(self, entry: &mut IndexEntry) {
        if let Some(full_path) = self.full_path {
            entry.full_path = Some(full_path);
        }
        if let Some(first_prompt) = self.first_prompt {
            entry.first_prompt = first_prompt;
        }
        if let Some(custom_title) = self.custom_title {
            entry.custom_title = Some(custom_title);
        }
        if let Some(message_count) = self.message_count {
            entry.message_count = Some(message_count);
        }
        if let Some(created) = self.created {
            entry.created = Some(created);
        }
        if let Some(modified) = self.modified {
            entry.modified = Some(modified);
        }
        if let Some(git_branch) = self.git_branch {
            entry.git_branch = git_branch;
        }
        if let Some(is_sidechain) = self.is_sidechain {
            entry.is_sidechain = Some(is_sidechain);
        }
        if let Some(file_size) = self.file_size {
            entry.file_size = Some(file_size);
        }
    }
}

/// Whether [`upsert_entry`] patched an existing entry or appended a new one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Updated,
    Inserted,
}

/// Merge `patch` into the entry for `session_id`, appending a minimal entry if none exists
///
/// A new entry starts with zero messages, no sidechain flag, and created/modified
/// times from the referenced file when it exists, otherwise the current time.
pub fn upsert_entry(index: &mut SessionsIndex, session_id: &str, patch: IndexEntryPatch) -> Upsert {
    if let Some(entry) = index.get_mut(session_id) {
        patch.apply(entry);
        return Upsert::Updated;
    }

    let mut entry = minimal_entry(session_id, patch.full_path.as_deref());
    patch.apply(&mut entry);
    index.entries.push(entry);
    Upsert::Inserted
}

fn minimal_entry(session_id: &str, full_path: Option<&Path>) -> IndexEntry {
    let stat = full_path.and_then(|p| FileStat::of(p).ok());
    let now = truncate_to_millis(Utc::now());

    let mut entry = IndexEntry::new(session_id);
    entry.full_path = full_path.map(Path::to_path_buf);
    entry.message_count = Some(0);
    entry.created = Some(stat.map_or(now, |s| s.created));
    entry.modified = Some(stat.map_or(now, |s| s.modified));
    entry.is_sidechain = Some(false);
    entry
}

/// Remove every entry for `session_id`; returns how many were removed
pub fn remove_entry(index: &mut SessionsIndex, session_id: &str) -> usize {
    let before = index.entries.len();
    index.entries.retain(|e| e.session_id != session_id);
    before - index.entries.len()
}
