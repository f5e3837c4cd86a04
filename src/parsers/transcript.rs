use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{IoResultExt, Result};
use crate::models::{MessageContent, MessageRecord, MessageType};
use crate::parsers::deserializers::{deserialize_flag, deserialize_lenient_timestamp};

/// Wire shape of a transcript line. Only `uuid` and `type` are required.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLine {
    uuid: String,
    #[serde(rename = "type")]
    line_type: String,
    #[serde(default)]
    parent_uuid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    is_meta: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    is_sidechain: bool,
    #[serde(default, deserialize_with = "deserialize_lenient_timestamp")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    git_branch: Option<String>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawBody {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<MessageContent>,
}

/// Outcome of parsing one physical line
#[derive(Debug)]
pub enum LineOutcome {
    Record(Box<MessageRecord>),
    /// Blank line
    Empty,
    /// Valid JSON without an identity (snapshots, summaries, ...)
    Unidentified,
    /// Not JSON, or JSON of the wrong shape
    Malformed(String),
}

/// Parse a single transcript line. `line` must not include its terminator.
pub fn parse_line(line: &str, line_number: usize) -> LineOutcome {
    if line.trim().is_empty() {
        return LineOutcome::Empty;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return LineOutcome::Malformed(e.to_string()),
    };
    if !value.is_object() {
        return LineOutcome::Malformed("line is not a JSON object".to_string());
    }
    if value.get("uuid").and_then(Value::as_str).is_none() {
        return LineOutcome::Unidentified;
    }

    let raw: RawLine = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => return LineOutcome::Malformed(e.to_string()),
    };

    // A body we cannot read costs us the text, not the record
    let (role, content) = match raw.message {
        Some(body) => match serde_json::from_value::<RawBody>(body) {
            Ok(body) => (body.role, body.content),
            Err(e) => {
                debug!("Unreadable message body on line {}: {}", line_number, e);
                (None, None)
            }
        },
        None => (None, None),
    };

    LineOutcome::Record(Box::new(MessageRecord {
        uuid: raw.uuid,
        parent_uuid: raw.parent_uuid.filter(|p| !p.is_empty()),
        message_type: MessageType::from_tag(&raw.line_type),
        role,
        content,
        is_meta: raw.is_meta,
        is_sidechain: raw.is_sidechain,
        timestamp: raw.timestamp,
        session_id: raw.session_id,
        git_branch: raw.git_branch.filter(|b| !b.is_empty()),
        line_number,
        raw: line.to_string(),
        extra: raw.extra,
    }))
}

/// Strip a trailing `\n` or `\r\n`
pub(crate) fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Handle on a transcript file; every call to [`Transcript::records`] starts over
#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
}

impl Transcript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lazily stream the identified records in file order
    pub fn records(&self) -> Result<TranscriptRecords> {
        let file = File::open(&self.path).at(&self.path)?;
        Ok(TranscriptRecords {
            path: self.path.clone(),
            reader: BufReader::new(file),
            buf: Vec::new(),
            line_number: 0,
            skipped: 0,
            done: false,
        })
    }
}

/// Iterator over the records of one transcript
///
/// Malformed lines are logged and skipped. A read error ends the stream early.
pub struct TranscriptRecords {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    line_number: usize,
    skipped: usize,
    done: bool,
}

impl TranscriptRecords {
    /// Lines skipped so far because they could not be parsed
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for TranscriptRecords {
    type Item = MessageRecord;

    fn next(&mut self) -> Option<MessageRecord> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                }
                Ok(_) => {
                    self.line_number += 1;
                    let Ok(text) = std::str::from_utf8(&self.buf) else {
                        warn!("Invalid UTF-8 at {}:{}", self.path.display(), self.line_number);
                        self.skipped += 1;
                        continue;
                    };
                    match parse_line(trim_line_ending(text), self.line_number) {
                        LineOutcome::Record(record) => return Some(*record),
                        LineOutcome::Empty | LineOutcome::Unidentified => {}
                        LineOutcome::Malformed(reason) => {
                            warn!(
                                "Skipping malformed line {}:{}: {}",
                                self.path.display(),
                                self.line_number,
                                reason
                            );
                            self.skipped += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to read {}: {}", self.path.display(), e);
                    self.done = true;
                }
            }
        }
        if self.skipped > 0 {
            debug!("Parsed {}: {} lines skipped", self.path.display(), self.skipped);
        }
        None
    }
}

/// Parse a whole transcript into memory
pub fn parse_transcript(path: &Path) -> Result<Vec<MessageRecord>> {
    Ok(Transcript::new(path).records()?.collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn create_test_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes()).expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_parse_valid_records_in_order() {
        let content = r#"{"type":"user","uuid":"u1","parentUuid":null,"message":{"role":"user","content":"Hello"},"timestamp":"2025-01-01T00:00:00Z","sessionId":"s1"}
{"type":"assistant","uuid":"a1","parentUuid":"u1","message":{"role":"assistant","content":[{"type":"text","text":"Hi"}]},"timestamp":"2025-01-01T00:00:01Z","sessionId":"s1"}
"#;
        let file = create_test_file(content);
        let records = parse_transcript(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].uuid, "u1");
        assert!(records[0].is_root());
        assert_eq!(records[1].parent_uuid.as_deref(), Some("u1"));
        assert_eq!(records[1].message_type, MessageType::Assistant);
        assert_eq!(records[1].line_number, 2);
        assert_eq!(records[1].role.as_deref(), Some("assistant"));
    }

    #[test]
    fn test_malformed_line_does_not_abort() {
        let content = r#"{"type":"user","uuid":"u1","message":{"content":"one"}}
{not json
{"type":"user","uuid":"u2","parentUuid":"u1","message":{"content":"two"}}
"#;
        let file = create_test_file(content);
        let transcript = Transcript::new(file.path());
        let mut records = transcript.records().unwrap();
        let collected: Vec<_> = records.by_ref().collect();

        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1].uuid, "u2");
        assert_eq!(collected[1].line_number, 3);
        assert_eq!(records.skipped(), 1);
    }

    #[test]
    fn test_lines_without_identity_or_type_are_skipped() {
        let content = r#"{"type":"file-history-snapshot","messageId":"m1","snapshot":{}}
{"type":"summary","summary":"Something","leafUuid":"u1"}
{"uuid":"no-type"}
{"type":"user","uuid":"u1","message":{"content":"kept"}}
"#;
        let file = create_test_file(content);
        let records = parse_transcript(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uuid, "u1");
    }

    #[test]
    fn test_records_are_restartable() {
        let file = create_test_file(r#"{"type":"user","uuid":"u1"}"#);
        let transcript = Transcript::new(file.path());
        assert_eq!(transcript.records().unwrap().count(), 1);
        assert_eq!(transcript.records().unwrap().count(), 1);
    }

    #[test]
    fn test_flags_and_unknown_fields() {
        let line = r#"{"type":"user","uuid":"u1","isMeta":true,"isSidechain":null,"gitBranch":"main","cwd":"/tmp","version":"2.0.1"}"#;
        let LineOutcome::Record(record) = parse_line(line, 1) else { panic!("expected record") };
        assert!(record.is_meta);
        assert!(!record.is_sidechain);
        assert_eq!(record.git_branch.as_deref(), Some("main"));
        assert_eq!(record.extra.get("cwd").and_then(Value::as_str), Some("/tmp"));
        assert_eq!(record.raw, line);
    }

    #[test]
    fn test_bad_body_keeps_record() {
        let line = r#"{"type":"assistant","uuid":"a1","message":{"content":42}}"#;
        let LineOutcome::Record(record) = parse_line(line, 1) else { panic!("expected record") };
        assert!(record.content.is_none());
    }

    #[test]
    fn test_crlf_and_invalid_utf8_lines() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"type\":\"user\",\"uuid\":\"u1\"}\r\n\xff\xfe\n{\"type\":\"user\",\"uuid\":\"u2\"}")
            .unwrap();
        file.flush().unwrap();

        let records = parse_transcript(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].raw, r#"{"type":"user","uuid":"u1"}"#);
        assert_eq!(records[1].line_number, 3);
    }

    #[test]
    fn test_nonexistent_transcript() {
        let result = parse_transcript(Path::new("/nonexistent/session.jsonl"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("/nonexistent/session.jsonl"));
    }
}
