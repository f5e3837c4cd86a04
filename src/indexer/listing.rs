//! Session and message listings with a configurable refresh policy

use std::cmp::Reverse;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::reconciler::{IndexReport, check_index, repair_index, transcript_files};
use crate::error::Result;
use crate::index_storage::{IndexState, load_index};
use crate::models::{MessageRecord, SessionInfo};
use crate::parsers::parse_transcript;
use crate::tree::{MessageTree, TextCleaner};
use crate::utils::{FileStat, session_id_from_path};

/// When listing sessions may repair the index
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Repair whenever the check reports anything
    #[default]
    Eager,
    /// Repair only when the index file is absent or corrupt
    Lazy,
    /// Never write; stale sessions are only flagged
    Never,
}

impl RefreshMode {
    fn wants_repair(self, report: &IndexReport) -> bool {
        match self {
            RefreshMode::Eager => !report.is_clean(),
            RefreshMode::Lazy => report.state != IndexState::Present,
            RefreshMode::Never => false,
        }
    }
}

/// One [`SessionInfo`] per transcript in `project_dir`, newest first
///
/// A failed repair is logged and the listing falls back to the index as it is.
pub fn list_sessions(
    project_dir: &Path,
    mode: RefreshMode,
    cleaner: &TextCleaner,
) -> Result<Vec<SessionInfo>> {
    let mut report = check_index(project_dir)?;
    if mode.wants_repair(&report) {
        match repair_index(project_dir, cleaner) {
            Ok(_) => report = check_index(project_dir)?,
            Err(e) => warn!("Could not repair index of {}: {}", project_dir.display(), e),
        }
    }

    let index = load_index(project_dir);
    let mut sessions = Vec::new();
    for path in transcript_files(project_dir)? {
        let Some(session_id) = session_id_from_path(&path) else { continue };
        let stale = report.is_stale(&session_id);
        let info = match index.get(&session_id) {
            Some(entry) => SessionInfo::from_entry(entry, path, stale),
            None => unindexed_session(session_id, path),
        };
        sessions.push(info);
    }

    sessions.sort_by_key(|s| Reverse(s.modified));
    Ok(sessions)
}

fn unindexed_session(session_id: String, path: std::path::PathBuf) -> SessionInfo {
    let stat = FileStat::of(&path).ok();
    SessionInfo {
        session_id,
        full_path: path,
        message_count: 0,
        first_prompt: None,
        summary: None,
        created: stat.map(|s| s.created),
        modified: stat.map(|s| s.modified),
        git_branch: None,
        is_sidechain: false,
        stale: true,
    }
}

/// Parsed records of one transcript in file order
pub fn list_messages(file: &Path) -> Result<Vec<MessageRecord>> {
    parse_transcript(file)
}

/// Parsed records of one transcript as a message tree
pub fn load_tree(file: &Path) -> Result<MessageTree> {
    Ok(MessageTree::build(parse_transcript(file)?))
}
