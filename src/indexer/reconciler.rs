//! Index reconciliation: report-only check and idempotent repair
//!
//! The transcripts belong to an external writer, so the index is never assumed
//! fresh. [`check_index`] compares it with the files on disk without touching
//! anything; [`repair_index`] rescans exactly the sessions the check flags and
//! patches them in one locked read-modify-write.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::scanner::{SessionScan, scan_session};
use crate::error::{Error, IoResultExt, Result};
use crate::index_storage::{
    IndexState, Upsert, load_index_with_state, remove_entry, update_index, upsert_entry,
};
use crate::models::{IndexEntry, SessionsIndex};
use crate::tree::TextCleaner;
use crate::utils::{FileStat, count_nonempty_lines, is_transcript_file, session_id_from_path};

/// Why a session's index entry cannot be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StaleReason {
    /// No entry for the transcript
    Missing,
    /// The entry points at a file that no longer exists
    Moved,
    /// The transcript was written after the entry was recorded
    Modified,
    /// The recorded size differs from the file's
    SizeChanged,
    /// Minimal entry that was never filled in by a scan
    Unscanned,
    /// More messages recorded than the file has lines
    ImplausibleCount,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StaleReason::Missing => "missing",
            StaleReason::Moved => "moved",
            StaleReason::Modified => "modified",
            StaleReason::SizeChanged => "size changed",
            StaleReason::Unscanned => "unscanned",
            StaleReason::ImplausibleCount => "implausible count",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleSession {
    pub session_id: String,
    pub path: PathBuf,
    pub reason: StaleReason,
}

/// Result of comparing a project's index with its transcripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub state: IndexState,
    pub transcripts: usize,
    pub stale: Vec<StaleSession>,
    /// Entries whose backing file no longer exists
    pub orphaned: Vec<String>,
    /// Session ids listed more than once
    pub duplicates: Vec<String>,
}

impl IndexReport {
    pub fn is_clean(&self) -> bool {
        self.state != IndexState::Corrupt
            && self.stale.is_empty()
            && self.orphaned.is_empty()
            && self.duplicates.is_empty()
    }

    pub fn is_stale(&self, session_id: &str) -> bool {
        self.stale.iter().any(|s| s.session_id == session_id)
    }
}

/// What a repair or rebuild changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub scanned: usize,
    pub inserted: usize,
    pub removed_orphans: usize,
    pub removed_duplicates: usize,
    /// Sessions whose transcript could not be scanned, with the reason
    pub failed: Vec<(String, String)>,
}

impl RepairReport {
    pub fn changed_anything(&self) -> bool {
        self.scanned > 0 || self.removed_orphans > 0 || self.removed_duplicates > 0
    }
}

/// Absolute paths of the transcript files directly inside `project_dir`, sorted by name
pub fn transcript_files(project_dir: &Path) -> Result<Vec<PathBuf>> {
    let project_dir: &Path = &std::path::absolute(project_dir).at(project_dir)?;
    let mut files = Vec::new();
    for entry in WalkDir::new(project_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Io {
            path: e.path().unwrap_or(project_dir).to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && is_transcript_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Report-only comparison of the index with the files on disk
pub fn check_index(project_dir: &Path) -> Result<IndexReport> {
    let files = transcript_files(project_dir)?;
    let (index, state) = load_index_with_state(project_dir);
    Ok(inspect(project_dir, &files, &index, state))
}

fn inspect(
    project_dir: &Path,
    files: &[PathBuf],
    index: &SessionsIndex,
    state: IndexState,
) -> IndexReport {
    let mut stale = Vec::new();

    for path in files {
        let Some(session_id) = session_id_from_path(path) else { continue };
        let reason = match index.get(&session_id) {
            None => Some(StaleReason::Missing),
            Some(entry) => match FileStat::of(path) {
                Ok(stat) => stale_reason(entry, path, &stat),
                Err(e) => {
                    warn!("Cannot stat {}: {}", path.display(), e);
                    None
                }
            },
        };
        if let Some(reason) = reason {
            debug!("Session {} is stale: {}", session_id, reason);
            stale.push(StaleSession { session_id, path: path.clone(), reason });
        }
    }

    let on_disk: HashSet<String> = files.iter().filter_map(|p| session_id_from_path(p)).collect();
    let mut orphaned = Vec::new();
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for entry in &index.entries {
        if !seen.insert(entry.session_id.as_str()) {
            if !duplicates.contains(&entry.session_id) {
                duplicates.push(entry.session_id.clone());
            }
            continue;
        }
        if !on_disk.contains(&entry.session_id) && !backing_file_exists(project_dir, entry) {
            orphaned.push(entry.session_id.clone());
        }
    }

    IndexReport { state, transcripts: files.len(), stale, orphaned, duplicates }
}

fn stale_reason(entry: &IndexEntry, path: &Path, stat: &FileStat) -> Option<StaleReason> {
    if entry.full_path.as_deref().is_some_and(|p| p != path && !p.is_file()) {
        return Some(StaleReason::Moved);
    }
    if entry.modified.is_none_or(|recorded| recorded < stat.modified) {
        return Some(StaleReason::Modified);
    }
    match entry.file_size {
        Some(size) if size != stat.size => return Some(StaleReason::SizeChanged),
        None if entry.message_count() == 0 && stat.size > 0 => return Some(StaleReason::Unscanned),
        _ => {}
    }
    if entry.message_count() > 0 {
        match count_nonempty_lines(path) {
            Ok(lines) if entry.message_count() > lines => return Some(StaleReason::ImplausibleCount),
            Ok(_) => {}
            Err(e) => warn!("Cannot count lines of {}: {}", path.display(), e),
        }
    }
    None
}

fn backing_file_exists(project_dir: &Path, entry: &IndexEntry) -> bool {
    match &entry.full_path {
        Some(path) => path.is_file(),
        None => project_dir.join(format!("{}.jsonl", entry.session_id)).is_file(),
    }
}

/// Rescan stale sessions, drop orphans and duplicate entries
///
/// Running it twice with no external change leaves the index file untouched the
/// second time.
pub fn repair_index(project_dir: &Path, cleaner: &TextCleaner) -> Result<RepairReport> {
    let files = transcript_files(project_dir)?;
    update_index(project_dir, |index, state| {
        let report = inspect(project_dir, &files, index, state);
        let targets: Vec<PathBuf> = report.stale.iter().map(|s| s.path.clone()).collect();

        let mut repair = RepairReport::default();
        apply_scans(index, scan_all(&targets, cleaner), &mut repair);
        repair.removed_orphans = remove_orphans(index, &report.orphaned);
        repair.removed_duplicates = dedup_entries(index);

        if repair.changed_anything() {
            info!(
                "Repaired index of {}: {} rescanned, {} orphans, {} duplicates",
                project_dir.display(),
                repair.scanned,
                repair.removed_orphans,
                repair.removed_duplicates
            );
        }
        Ok(repair)
    })
}

/// Rescan every transcript, keeping titles and unknown fields of existing entries
pub fn rebuild_index(project_dir: &Path, cleaner: &TextCleaner) -> Result<RepairReport> {
    let files = transcript_files(project_dir)?;
    update_index(project_dir, |index, state| {
        let report = inspect(project_dir, &files, index, state);

        let mut repair = RepairReport::default();
        apply_scans(index, scan_all(&files, cleaner), &mut repair);
        repair.removed_orphans = remove_orphans(index, &report.orphaned);
        repair.removed_duplicates = dedup_entries(index);

        info!("Rebuilt index of {}: {} transcripts", project_dir.display(), repair.scanned);
        Ok(repair)
    })
}

fn scan_all(paths: &[PathBuf], cleaner: &TextCleaner) -> Vec<(PathBuf, Result<SessionScan>)> {
    paths.par_iter().map(|path| (path.clone(), scan_session(path, cleaner))).collect()
}

fn apply_scans(
    index: &mut SessionsIndex,
    scans: Vec<(PathBuf, Result<SessionScan>)>,
    repair: &mut RepairReport,
) {
    for (path, scan) in scans {
        match scan {
            Ok(scan) => {
                let session_id = scan.session_id.clone();
                if upsert_entry(index, &session_id, scan.into_patch()) == Upsert::Inserted {
                    repair.inserted += 1;
                }
                repair.scanned += 1;
            }
            Err(e) => {
                warn!("Failed to scan {}: {}", path.display(), e);
                let session_id = session_id_from_path(&path).unwrap_or_default();
                repair.failed.push((session_id, e.to_string()));
            }
        }
    }
}

fn remove_orphans(index: &mut SessionsIndex, orphaned: &[String]) -> usize {
    orphaned.iter().map(|id| remove_entry(index, id)).sum()
}

/// Keep the first entry of every session id
fn dedup_entries(index: &mut SessionsIndex) -> usize {
    let mut seen = HashSet::with_capacity(index.entries.len());
    let before = index.entries.len();
    index.entries.retain(|e| seen.insert(e.session_id.clone()));
    before - index.entries.len()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::index_storage::{IndexEntryPatch, save_index};
    use crate::utils::INDEX_FILENAME;

    const LINES: &str = concat!(
        r#"{"type":"user","uuid":"a","parentUuid":null,"message":{"content":"hello"}}"#,
        "\n",
        r#"{"type":"assistant","uuid":"b","parentUuid":"a","message":{"content":"hi"}}"#,
        "\n"
    );

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("s1.jsonl"), LINES).unwrap();
        fs::write(dir.path().join("s2.jsonl"), LINES).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        dir
    }

    #[test]
    fn test_check_without_index_reports_all_missing() {
        let dir = project();
        let report = check_index(dir.path()).unwrap();
        assert_eq!(report.state, IndexState::Absent);
        assert_eq!(report.transcripts, 2);
        assert!(report.stale.iter().all(|s| s.reason == StaleReason::Missing));
        assert!(!dir.path().join(INDEX_FILENAME).exists());
    }

    #[test]
    fn test_repair_then_check_is_clean() {
        let dir = project();
        let repair = repair_index(dir.path(), &TextCleaner::default()).unwrap();
        assert_eq!(repair.scanned, 2);
        assert_eq!(repair.inserted, 2);

        let report = check_index(dir.path()).unwrap();
        assert!(report.is_clean(), "{:?}", report);

        let index = crate::index_storage::load_index(dir.path());
        let entry = index.get("s1").unwrap();
        assert_eq!(entry.message_count, Some(2));
        assert_eq!(entry.first_prompt.as_deref(), Some("hello"));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let dir = project();
        repair_index(dir.path(), &TextCleaner::default()).unwrap();
        let first = fs::read(dir.path().join(INDEX_FILENAME)).unwrap();

        let second_run = repair_index(dir.path(), &TextCleaner::default()).unwrap();
        assert!(!second_run.changed_anything());
        assert_eq!(fs::read(dir.path().join(INDEX_FILENAME)).unwrap(), first);
    }

    #[test]
    fn test_orphans_and_duplicates_removed() {
        let dir = project();
        repair_index(dir.path(), &TextCleaner::default()).unwrap();

        let mut index = crate::index_storage::load_index(dir.path());
        index.entries.push(index.entries[0].clone());
        let mut ghost = IndexEntry::new("ghost");
        ghost.full_path = Some(dir.path().join("ghost.jsonl"));
        index.entries.push(ghost);
        save_index(dir.path(), &index).unwrap();

        let report = check_index(dir.path()).unwrap();
        assert_eq!(report.orphaned, vec!["ghost".to_string()]);
        assert_eq!(report.duplicates, vec!["s1".to_string()]);

        let repair = repair_index(dir.path(), &TextCleaner::default()).unwrap();
        assert_eq!(repair.removed_orphans, 1);
        assert_eq!(repair.removed_duplicates, 1);
        assert!(check_index(dir.path()).unwrap().is_clean());
    }

    #[test]
    fn test_minimal_entry_is_unscanned() {
        let dir = project();
        let mut index = SessionsIndex::default();
        let patch = IndexEntryPatch {
            full_path: Some(dir.path().join("s1.jsonl")),
            ..IndexEntryPatch::custom_title("Title")
        };
        upsert_entry(&mut index, "s1", patch);
        save_index(dir.path(), &index).unwrap();

        let report = check_index(dir.path()).unwrap();
        let s1 = report.stale.iter().find(|s| s.session_id == "s1").unwrap();
        assert_eq!(s1.reason, StaleReason::Unscanned);

        repair_index(dir.path(), &TextCleaner::default()).unwrap();
        let entry = crate::index_storage::load_index(dir.path()).get("s1").cloned().unwrap();
        assert_eq!(entry.custom_title.as_deref(), Some("Title"));
        assert_eq!(entry.message_count, Some(2));
    }

    #[test]
    fn test_appended_transcript_is_flagged() {
        let dir = project();
        repair_index(dir.path(), &TextCleaner::default()).unwrap();

        let path = dir.path().join("s2.jsonl");
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str(r#"{"type":"user","uuid":"c","parentUuid":"b","message":{"content":"more"}}"#);
        content.push('\n');
        fs::write(&path, content).unwrap();

        let report = check_index(dir.path()).unwrap();
        let s2 = report.stale.iter().find(|s| s.session_id == "s2").unwrap();
        assert!(matches!(s2.reason, StaleReason::Modified | StaleReason::SizeChanged));
    }

    #[test]
    fn test_implausible_count_flagged() {
        let dir = project();
        repair_index(dir.path(), &TextCleaner::default()).unwrap();

        let mut index = crate::index_storage::load_index(dir.path());
        index.get_mut("s1").unwrap().message_count = Some(40);
        save_index(dir.path(), &index).unwrap();

        let report = check_index(dir.path()).unwrap();
        assert_eq!(report.stale.len(), 1);
        assert_eq!(report.stale[0].reason, StaleReason::ImplausibleCount);
    }

    #[test]
    fn test_rebuild_keeps_titles_and_extras() {
        let dir = project();
        repair_index(dir.path(), &TextCleaner::default()).unwrap();

        let mut index = crate::index_storage::load_index(dir.path());
        let entry = index.get_mut("s2").unwrap();
        entry.custom_title = Some("Keep me".to_string());
        entry.extra.insert("projectPath".to_string(), serde_json::json!("/x"));
        entry.message_count = Some(1);
        save_index(dir.path(), &index).unwrap();

        let repair = rebuild_index(dir.path(), &TextCleaner::default()).unwrap();
        assert_eq!(repair.scanned, 2);

        let entry = crate::index_storage::load_index(dir.path()).get("s2").cloned().unwrap();
        assert_eq!(entry.custom_title.as_deref(), Some("Keep me"));
        assert_eq!(entry.extra.get("projectPath"), Some(&serde_json::json!("/x")));
        assert_eq!(entry.message_count, Some(2));
    }

    #[test]
    fn test_missing_project_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = check_index(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_relative_project_dir_records_absolute_paths() {
        let dir = TempDir::new_in(".").unwrap();
        let relative = Path::new(".").join(dir.path().file_name().unwrap());
        fs::write(relative.join("s1.jsonl"), LINES).unwrap();

        repair_index(&relative, &TextCleaner::default()).unwrap();
        let entry = crate::index_storage::load_index(&relative).get("s1").cloned().unwrap();
        let full_path = entry.full_path.unwrap();
        assert!(full_path.is_absolute());
        assert_eq!(full_path, std::path::absolute(relative.join("s1.jsonl")).unwrap());
        assert!(check_index(&relative).unwrap().is_clean());
    }
}
