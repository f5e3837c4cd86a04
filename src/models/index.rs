use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema version written to `sessions-index.json`
pub const INDEX_VERSION: u32 = 1;

fn default_version() -> u32 {
    INDEX_VERSION
}

/// Contents of one project's `sessions-index.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionsIndex {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub entries: Vec<IndexEntry>,
    /// Top-level fields written by other tools (e.g. `originalPath`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SessionsIndex {
    fn default() -> Self {
        Self { version: INDEX_VERSION, entries: Vec::new(), extra: Map::new() }
    }
}

impl SessionsIndex {
    pub fn get(&self, session_id: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.session_id == session_id)
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut IndexEntry> {
        self.entries.iter_mut().find(|e| e.session_id == session_id)
    }

    pub fn original_path(&self) -> Option<&str> {
        self.extra.get("originalPath").and_then(Value::as_str)
    }
}

/// One persisted record per session
///
/// Everything but `sessionId` is optional on read so foreign or hand-edited
/// indexes load without losing fields; unknown keys survive in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::parsers::deserializers::iso_millis")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::parsers::deserializers::iso_millis")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sidechain: Option<bool>,
    /// Transcript size in bytes when it was last scanned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IndexEntry {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            full_path: None,
            first_prompt: None,
            custom_title: None,
            message_count: None,
            created: None,
            modified: None,
            git_branch: None,
            is_sidechain: None,
            file_size: None,
            extra: Map::new(),
        }
    }

    pub fn message_count(&self) -> u64 {
        self.message_count.unwrap_or(0)
    }
}
