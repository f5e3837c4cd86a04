//! Full scan of one transcript into index metadata

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::Result;
use crate::index_storage::IndexEntryPatch;
use crate::parsers::Transcript;
use crate::parsers::deserializers::truncate_to_millis;
use crate::tree::{MessageTree, TextCleaner};
use crate::utils::{FileStat, session_id_from_path};

/// Everything the index records about a session, derived from its transcript
#[derive(Debug, Clone, PartialEq)]
pub struct SessionScan {
    pub session_id: String,
    pub full_path: PathBuf,
    pub message_count: u64,
    pub first_prompt: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub git_branch: Option<String>,
    pub is_sidechain: bool,
    pub file_size: u64,
}

impl SessionScan {
    /// Patch covering every derived field; `customTitle` is never touched
    pub fn into_patch(self) -> IndexEntryPatch {
        IndexEntryPatch {
            full_path: Some(self.full_path),
            first_prompt: Some(self.first_prompt),
            custom_title: None,
            message_count: Some(self.message_count),
            created: Some(self.created),
            modified: Some(self.modified),
            git_branch: Some(self.git_branch),
            is_sidechain: Some(self.is_sidechain),
            file_size: Some(self.file_size),
        }
    }

    /// Derive the metadata of an already built tree, given the file's stat
    pub fn from_tree(
        session_id: String,
        path: &Path,
        tree: &MessageTree,
        stat: FileStat,
        cleaner: &TextCleaner,
    ) -> Self {
        Self {
            session_id,
            full_path: path.to_path_buf(),
            message_count: tree.message_count() as u64,
            first_prompt: tree.first_user_prompt(cleaner),
            created: tree.first_timestamp().map(truncate_to_millis).unwrap_or(stat.created),
            modified: stat.modified,
            git_branch: tree.git_branch().map(str::to_string),
            is_sidechain: tree.is_sidechain(),
            file_size: stat.size,
        }
    }
}

/// Parse and tree-build `path`, then derive its index metadata
///
/// The file is stat'ed before it is read. If the external writer appends while
/// the scan runs, the recorded mtime is older than the file's and the next check
/// flags the session again.
pub fn scan_session(path: &Path, cleaner: &TextCleaner) -> Result<SessionScan> {
    let stat = FileStat::of(path)?;
    let mut records = Transcript::new(path).records()?;
    let tree = MessageTree::build(records.by_ref().collect());

    let session_id = session_id_from_path(path)
        .or_else(|| tree.messages().find_map(|r| r.session_id.clone()))
        .unwrap_or_default();

    debug!(
        "Scanned {}: {} messages, {} skipped lines",
        path.display(),
        tree.message_count(),
        records.skipped()
    );

    Ok(SessionScan::from_tree(session_id, path, &tree, stat, cleaner))
}
