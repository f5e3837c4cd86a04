use std::path::Path;

use tracing::info;

use super::prompt::{SUMMARY_INSTRUCTIONS, build_prompt, summary_excerpts};
use super::summarizer::Summarizer;
use crate::error::{Error, IoResultExt, Result};
use crate::index_storage::{IndexEntryPatch, update_index, upsert_entry};
use crate::parsers::parse_transcript;
use crate::tree::{MessageTree, TextCleaner};

/// Record `summary` as the session's `customTitle`
///
/// Only the title is written. A session missing from the index gets a minimal
/// entry (no messages, timestamps from the file or the current time); message
/// counts and prompts are left for the reconciler.
pub fn merge_summary(project_dir: &Path, session_id: &str, file: &Path, summary: &str) -> Result<()> {
    let file = std::path::absolute(file).at(file)?;
    update_index(project_dir, |index, _| {
        let mut patch = IndexEntryPatch::custom_title(summary);
        if index.get(session_id).is_none() {
            patch.full_path = Some(file.clone());
        }
        upsert_entry(index, session_id, patch);
        Ok(())
    })?;
    info!("Merged summary for session {}", session_id);
    Ok(())
}

/// Summarize the session's first user messages and merge the result
///
/// The transcript and index are left untouched when there is nothing to
/// summarize or the summarizer fails.
pub fn generate_and_merge_summary(
    summarizer: &dyn Summarizer,
    file: &Path,
    session_id: &str,
    project_dir: &Path,
    cleaner: &TextCleaner,
) -> Result<String> {
    let tree = MessageTree::build(parse_transcript(file)?);
    let excerpts = summary_excerpts(&tree, cleaner);
    if excerpts.is_empty() {
        return Err(Error::NoUserMessages(file.to_path_buf()));
    }

    let answer = summarizer.summarize(SUMMARY_INSTRUCTIONS, &build_prompt(&excerpts))?;
    let summary = answer.trim();
    if summary.is_empty() {
        return Err(Error::Upstream("empty response from summarizer".to_string()));
    }

    merge_summary(project_dir, session_id, file, summary)?;
    Ok(summary.to_string())
}
