//! Cascading deletion of a message and its descendants

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, IoResultExt, Result};
use crate::index_storage::{IndexState, update_index, upsert_entry};
use crate::indexer::SessionScan;
use crate::models::MessageRecord;
use crate::parsers::transcript::trim_line_ending;
use crate::parsers::{LineOutcome, parse_line};
use crate::tree::{MessageTree, TextCleaner};
use crate::utils::{FileStat, project_dir_of, session_id_from_path, write_atomically};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionOutcome {
    pub session_id: String,
    /// Distinct messages removed, the target included
    pub deleted: usize,
    /// Lines dropped from the file, duplicates of removed messages included
    pub lines_removed: usize,
    /// Messages left in the transcript
    pub remaining: usize,
    /// Whether the project index was patched
    pub index_updated: bool,
}

/// A transcript held as raw lines, each paired with its parsed record if it has one
struct RawTranscript {
    lines: Vec<(Vec<u8>, Option<MessageRecord>)>,
}

impl RawTranscript {
    fn parse(bytes: &[u8]) -> Self {
        let lines = bytes
            .split_inclusive(|b| *b == b'\n')
            .enumerate()
            .map(|(i, line)| {
                let record = std::str::from_utf8(line).ok().and_then(|text| {
                    match parse_line(trim_line_ending(text), i + 1) {
                        LineOutcome::Record(record) => Some(*record),
                        _ => None,
                    }
                });
                (line.to_vec(), record)
            })
            .collect();
        Self { lines }
    }

    fn tree(&self) -> MessageTree {
        MessageTree::build(self.lines.iter().filter_map(|(_, r)| r.clone()).collect())
    }

    /// Surviving bytes and the number of lines dropped
    fn without(&self, doomed: &HashSet<String>) -> (Vec<u8>, usize) {
        let mut out = Vec::new();
        let mut dropped = 0;
        for (raw, record) in &self.lines {
            if record.as_ref().is_some_and(|r| doomed.contains(&r.uuid)) {
                dropped += 1;
                continue;
            }
            out.extend_from_slice(raw);
        }
        (out, dropped)
    }
}

/// Remove `target` and every message descending from it from the transcript
///
/// Surviving lines are written back byte-for-byte in their original order, lines
/// without an identity included. The rewrite is atomic. If the file changes
/// between reading and replacing it, nothing is written and
/// [`Error::TranscriptChanged`] is returned.
///
/// When the project already has an index, every derived field of the session's
/// entry is recomputed from the surviving messages; `customTitle` is kept.
pub fn delete_from(file: &Path, target: &str, cleaner: &TextCleaner) -> Result<DeletionOutcome> {
    let file: &Path = &std::path::absolute(file).at(file)?;
    let before = FileStat::of(file)?;
    let bytes = fs::read(file).at(file)?;
    let transcript = RawTranscript::parse(&bytes);
    let tree = transcript.tree();

    let doomed = tree
        .subtree_ids(target)
        .ok_or_else(|| Error::NotFound { path: file.to_path_buf(), uuid: target.to_string() })?;
    let (survivors, lines_removed) = transcript.without(&doomed);

    if FileStat::of(file)? != before {
        return Err(Error::TranscriptChanged(file.to_path_buf()));
    }
    write_atomically(file, &survivors)?;

    let session_id = session_id_from_path(file).unwrap_or_default();
    let remaining = RawTranscript::parse(&survivors).tree();
    info!(
        "Deleted {} messages ({} lines) from {}",
        doomed.len(),
        lines_removed,
        file.display()
    );

    let index_updated = refresh_index_entry(file, &session_id, &remaining, cleaner)
        .inspect_err(|e| warn!("Transcript rewritten but index update failed for {}: {}", session_id, e))?;

    Ok(DeletionOutcome {
        session_id,
        deleted: doomed.len(),
        lines_removed,
        remaining: remaining.message_count(),
        index_updated,
    })
}

/// Patch the session's entry, unless the project has no index yet
fn refresh_index_entry(
    file: &Path,
    session_id: &str,
    remaining: &MessageTree,
    cleaner: &TextCleaner,
) -> Result<bool> {
    let stat = FileStat::of(file)?;
    let project_dir = project_dir_of(file);
    let patch = SessionScan::from_tree(session_id.to_string(), file, remaining, stat, cleaner).into_patch();

    update_index(&project_dir, |index, state| {
        if state != IndexState::Present {
            return Ok(false);
        }
        upsert_entry(index, session_id, patch);
        Ok(true)
    })
}
