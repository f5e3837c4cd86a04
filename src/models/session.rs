use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::IndexEntry;

/// A session as presented to callers: index data merged with what is on disk
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub full_path: PathBuf,
    pub message_count: u64,
    pub first_prompt: Option<String>,
    pub summary: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub git_branch: Option<String>,
    pub is_sidechain: bool,
    /// The index entry is missing or out of date for this transcript
    pub stale: bool,
}

impl SessionInfo {
    pub fn from_entry(entry: &IndexEntry, full_path: PathBuf, stale: bool) -> Self {
        Self {
            session_id: entry.session_id.clone(),
            full_path,
            message_count: entry.message_count(),
            first_prompt: entry.first_prompt.clone(),
            summary: entry.custom_title.clone(),
            created: entry.created,
            modified: entry.modified,
            git_branch: entry.git_branch.clone(),
            is_sidechain: entry.is_sidechain.unwrap_or(false),
            stale,
        }
    }

    /// Title shown in listings: the summary if one exists, else the first prompt
    pub fn display_title(&self) -> &str {
        self.summary
            .as_deref()
            .or(self.first_prompt.as_deref())
            .unwrap_or("(untitled)")
    }
}
