use std::borrow::Cow;
use std::env;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Name of the per-project index file
pub const INDEX_FILENAME: &str = "sessions-index.json";

/// Extension of transcript files
pub const TRANSCRIPT_EXTENSION: &str = "jsonl";

/// Decodes a project directory name back to the working directory it stands for
///
/// Percent-encoded names (`-Users%2Ffoo%2Fbar`) decode exactly. The assistant's
/// own dash form (`-Users-foo-bar`) is lossy, so dashes are read as separators.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use session_keeper::decode_project_dir_name;
///
/// assert_eq!(decode_project_dir_name("-Users%2Ffoo%2Fbar"), PathBuf::from("/Users/foo/bar"));
/// assert_eq!(decode_project_dir_name("-home-me-code"), PathBuf::from("/home/me/code"));
/// ```
pub fn decode_project_dir_name(encoded: &str) -> PathBuf {
    let without_prefix = encoded.strip_prefix('-').unwrap_or(encoded);

    if without_prefix.contains('%') {
        let decoded = percent_decode_str(without_prefix).decode_utf8_lossy();
        return PathBuf::from(format!("/{}", decoded));
    }

    PathBuf::from(format!("/{}", without_prefix.replace('-', "/")))
}

/// Session identifier of a transcript: its file stem
pub fn session_id_from_path(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

pub fn is_transcript_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TRANSCRIPT_EXTENSION)
}

pub fn index_path(project_dir: &Path) -> PathBuf {
    project_dir.join(INDEX_FILENAME)
}

/// Project directory of a transcript (its parent, `.` for bare file names)
pub fn project_dir_of(transcript: &Path) -> PathBuf {
    match transcript.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Formats a path with ~ substitution for the home directory
pub fn format_path_with_tilde(path: &Path) -> String {
    format_path_with_tilde_internal(path, None)
}

pub(crate) fn format_path_with_tilde_internal(path: &Path, home_override: Option<&str>) -> String {
    let home_from_env = env::var("HOME").ok();
    let home = home_override.or(home_from_env.as_deref()).filter(|h| !h.is_empty());

    let path_str = path.to_string_lossy();
    if let Some(home) = home
        && let Some(rest) = path_str.strip_prefix(home)
        && (rest.is_empty() || rest.starts_with('/'))
    {
        return format!("~{}", rest);
    }

    match path_str {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}
