//! Human-readable rendering of listings and reports

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::editing::DeletionOutcome;
use crate::indexer::{IndexReport, RepairReport};
use crate::models::{MessageRecord, ProjectInfo, SessionInfo};
use crate::tree::MessageTree;
use crate::utils::display::{preview, sanitize, short_id};
use crate::utils::format_path_with_tilde;

const PREVIEW_CHARS: usize = 80;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "-".repeat(16),
    }
}

pub fn render_projects(projects: &[ProjectInfo]) -> String {
    let mut out = String::new();
    for project in projects {
        let _ = writeln!(
            out,
            "{}  {:>4} sessions  {}",
            format_time(project.last_modified),
            project.session_count(),
            sanitize(&format_path_with_tilde(&project.decoded_path))
        );
    }
    out
}

pub fn render_sessions(sessions: &[SessionInfo]) -> String {
    let mut out = String::new();
    for session in sessions {
        let marker = if session.stale { "*" } else { " " };
        let branch = session.git_branch.as_deref().map(|b| format!(" [{}]", sanitize(b))).unwrap_or_default();
        let _ = writeln!(
            out,
            "{}{} {}  {:>5} msgs  {}{}",
            marker,
            short_id(&session.session_id),
            format_time(session.modified),
            session.message_count,
            preview(session.display_title(), PREVIEW_CHARS),
            branch
        );
    }
    out
}

fn record_line(record: &MessageRecord) -> String {
    let text = record.content.as_ref().map(|c| c.plain_text()).unwrap_or_default();
    let mut flags = String::new();
    if record.is_meta {
        flags.push_str(" (meta)");
    }
    if record.is_sidechain {
        flags.push_str(" (sidechain)");
    }
    format!(
        "{} {:<9}{} {}",
        short_id(&record.uuid),
        record.message_type.as_str(),
        flags,
        preview(&text, PREVIEW_CHARS)
    )
}

pub fn render_messages(records: &[MessageRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, "{:>5}  {}", record.line_number, record_line(record));
    }
    out
}

/// Depth-first rendering; iterative so deep conversations cannot overflow the stack
pub fn render_tree(tree: &MessageTree) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&MessageRecord, usize)> = tree.roots().map(|r| (r, 0)).collect();
    stack.reverse();

    while let Some((record, depth)) = stack.pop() {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), record_line(record));
        let children: Vec<_> = tree.children(&record.uuid).collect();
        stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
    }
    out
}

pub fn render_check(report: &IndexReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Index {:?}: {} transcripts, {} stale, {} orphaned, {} duplicated",
        report.state,
        report.transcripts,
        report.stale.len(),
        report.orphaned.len(),
        report.duplicates.len()
    );
    for stale in &report.stale {
        let _ = writeln!(out, "  stale     {}  {}", stale.session_id, stale.reason);
    }
    for id in &report.orphaned {
        let _ = writeln!(out, "  orphaned  {}", id);
    }
    for id in &report.duplicates {
        let _ = writeln!(out, "  duplicate {}", id);
    }
    out
}

pub fn render_repair(report: &RepairReport) -> String {
    let mut out = String::new();
    if !report.changed_anything() && report.failed.is_empty() {
        out.push_str("Index is up to date\n");
        return out;
    }
    let _ = writeln!(
        out,
        "Rescanned {} sessions ({} new), removed {} orphaned and {} duplicate entries",
        report.scanned, report.inserted, report.removed_orphans, report.removed_duplicates
    );
    for (id, reason) in &report.failed {
        let _ = writeln!(out, "  failed {}: {}", id, reason);
    }
    out
}

pub fn render_deletion(outcome: &DeletionOutcome) -> String {
    let index = if outcome.index_updated { "index updated" } else { "no index to update" };
    format!(
        "Deleted {} messages from session {}, {} remaining ({})\n",
        outcome.deleted, outcome.session_id, outcome.remaining, index
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{LineOutcome, parse_line};

    fn record(uuid: &str, parent: Option<&str>, text: &str) -> MessageRecord {
        let parent = parent.map(|p| format!(r#""{}""#, p)).unwrap_or_else(|| "null".to_string());
        let json = format!(
            r#"{{"type":"user","uuid":"{uuid}","parentUuid":{parent},"message":{{"content":"{text}"}}}}"#
        );
        match parse_line(&json, 1) {
            LineOutcome::Record(r) => *r,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tree_indents_children() {
        let tree = MessageTree::build(vec![
            record("aaaaaaaa-1", None, "root"),
            record("bbbbbbbb-2", Some("aaaaaaaa-1"), "child"),
            record("cccccccc-3", Some("bbbbbbbb-2"), "grandchild"),
            record("dddddddd-4", Some("aaaaaaaa-1"), "second child"),
        ]);
        let rendered = render_tree(&tree);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "aaaaaaaa user      root");
        assert_eq!(lines[1], "  bbbbbbbb user      child");
        assert_eq!(lines[2], "    cccccccc user      grandchild");
        assert_eq!(lines[3], "  dddddddd user      second child");
    }

    #[test]
    fn test_messages_strip_escapes() {
        let rendered = render_messages(&[record("id", None, r"\u001b[31mred\u001b[0m")]);
        assert!(rendered.contains("red"));
        assert!(!rendered.contains('\u{1b}'));
    }
}
