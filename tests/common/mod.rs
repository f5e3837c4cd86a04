//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

/// Builder for creating test .claude directory structures
pub struct ClaudeDirBuilder {
    temp_dir: TempDir,
}

impl ClaudeDirBuilder {
    /// Create a new builder with an empty .claude directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add a project directory with the given encoded name and transcripts
    pub fn with_project(self, encoded_name: &str, transcripts: &[TranscriptBuilder]) -> Self {
        let project_dir = self.project_dir(encoded_name);
        fs::create_dir_all(&project_dir).expect("Failed to create project dir");
        for transcript in transcripts {
            transcript.create_in(&project_dir);
        }
        self
    }

    /// Write a raw `sessions-index.json` into a project
    pub fn with_index(self, encoded_name: &str, content: &str) -> Self {
        let project_dir = self.project_dir(encoded_name);
        fs::create_dir_all(&project_dir).expect("Failed to create project dir");
        fs::write(project_dir.join("sessions-index.json"), content).expect("Failed to write index");
        self
    }

    pub fn project_dir(&self, encoded_name: &str) -> PathBuf {
        self.temp_dir.path().join("projects").join(encoded_name)
    }

    /// Build and return the temp directory (consumes self)
    pub fn build(self) -> TempDir {
        self.temp_dir
    }
}

impl Default for ClaudeDirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one transcript file
#[derive(Clone)]
pub struct TranscriptBuilder {
    session_id: String,
    lines: Vec<String>,
}

impl TranscriptBuilder {
    /// A transcript with a random session id
    pub fn new() -> Self {
        Self::with_id(&uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(session_id: &str) -> Self {
        Self { session_id: session_id.to_string(), lines: Vec::new() }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn message(mut self, record: RecordBuilder) -> Self {
        self.lines.push(record.with_session(&self.session_id).to_json());
        self
    }

    /// A line written verbatim, valid or not
    pub fn raw_line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn content(&self) -> String {
        let mut content = self.lines.join("\n");
        content.push('\n');
        content
    }

    pub fn file_name(&self) -> String {
        format!("{}.jsonl", self.session_id)
    }

    /// Write the transcript into `dir` and return its path
    pub fn create_in(&self, dir: &Path) -> PathBuf {
        let path = dir.join(self.file_name());
        fs::write(&path, self.content()).expect("Failed to write transcript");
        path
    }
}

impl Default for TranscriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one transcript record
#[derive(Clone)]
pub struct RecordBuilder {
    uuid: String,
    parent: Option<String>,
    kind: String,
    content: Value,
    is_meta: bool,
    is_sidechain: bool,
    timestamp: Option<String>,
    git_branch: Option<String>,
    session_id: Option<String>,
}

impl RecordBuilder {
    /// A root user message with plain-string content
    pub fn user(uuid: &str, text: &str) -> Self {
        Self {
            uuid: uuid.to_string(),
            parent: None,
            kind: "user".to_string(),
            content: Value::String(text.to_string()),
            is_meta: false,
            is_sidechain: false,
            timestamp: None,
            git_branch: None,
            session_id: None,
        }
    }

    /// An assistant message with a single text block
    pub fn assistant(uuid: &str, text: &str) -> Self {
        Self {
            kind: "assistant".to_string(),
            content: json!([{ "type": "text", "text": text }]),
            ..Self::user(uuid, text)
        }
    }

    pub fn parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn meta(mut self) -> Self {
        self.is_meta = true;
        self
    }

    pub fn sidechain(mut self) -> Self {
        self.is_sidechain = true;
        self
    }

    pub fn blocks(mut self, blocks: Value) -> Self {
        self.content = blocks;
        self
    }

    pub fn timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    pub fn git_branch(mut self, branch: &str) -> Self {
        self.git_branch = Some(branch.to_string());
        self
    }

    fn with_session(mut self, session_id: &str) -> Self {
        self.session_id.get_or_insert_with(|| session_id.to_string());
        self
    }

    pub fn to_json(&self) -> String {
        let mut value = json!({
            "parentUuid": self.parent,
            "isSidechain": self.is_sidechain,
            "type": self.kind,
            "message": { "role": self.kind, "content": self.content },
            "uuid": self.uuid,
            "cwd": "/Users/test/project",
            "version": "1.0.0",
        });
        let object = value.as_object_mut().expect("record is an object");
        if self.is_meta {
            object.insert("isMeta".to_string(), json!(true));
        }
        if let Some(ts) = &self.timestamp {
            object.insert("timestamp".to_string(), json!(ts));
        }
        if let Some(branch) = &self.git_branch {
            object.insert("gitBranch".to_string(), json!(branch));
        }
        if let Some(session_id) = &self.session_id {
            object.insert("sessionId".to_string(), json!(session_id));
        }
        value.to_string()
    }
}

/// Transcript `1 <- 2 <- 3` (user, assistant, user)
pub fn three_message_chain(session_id: &str) -> TranscriptBuilder {
    TranscriptBuilder::with_id(session_id)
        .message(RecordBuilder::user("1", "Fix the login bug"))
        .message(RecordBuilder::assistant("2", "Looking at auth.rs").parent("1"))
        .message(RecordBuilder::user("3", "Thanks").parent("2"))
}
