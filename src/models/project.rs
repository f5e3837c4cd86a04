use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub encoded_name: String,
    pub decoded_path: PathBuf,
    pub project_dir: PathBuf,
    pub transcript_files: Vec<PathBuf>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ProjectInfo {
    pub fn session_count(&self) -> usize {
        self.transcript_files.len()
    }
}
