use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use super::reconciler::transcript_files;
use crate::error::{Error, Result};
use crate::index_storage::load_index;
use crate::models::ProjectInfo;
use crate::utils::{FileStat, decode_project_dir_name};

/// Discover every project directory under `<claude_dir>/projects`
///
/// The original working directory comes from the index's `originalPath` when
/// present, since the dash-encoded directory name is lossy. Symlinked entries are
/// not followed. Returns an empty list if the projects directory doesn't exist.
///
/// Projects are sorted by their newest transcript, most recent first.
pub fn list_projects(claude_dir: &Path) -> Result<Vec<ProjectInfo>> {
    let projects_dir = claude_dir.join("projects");
    if !projects_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut projects = Vec::new();
    for entry in WalkDir::new(&projects_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Io {
            path: e.path().unwrap_or(&projects_dir).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let project_dir = entry.into_path();
        match describe_project(&project_dir) {
            Ok(project) => projects.push(project),
            Err(e) => warn!("Skipping project directory {}: {}", project_dir.display(), e),
        }
    }

    projects.sort_by(|a, b| {
        Reverse(a.last_modified).cmp(&Reverse(b.last_modified)).then(a.encoded_name.cmp(&b.encoded_name))
    });
    Ok(projects)
}

fn describe_project(project_dir: &Path) -> Result<ProjectInfo> {
    let encoded_name = project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let decoded_path = load_index(project_dir)
        .original_path()
        .map(PathBuf::from)
        .unwrap_or_else(|| decode_project_dir_name(&encoded_name));

    let transcript_files = transcript_files(project_dir)?;
    let last_modified =
        transcript_files.iter().filter_map(|p| FileStat::of(p).ok()).map(|s| s.modified).max();

    Ok(ProjectInfo {
        encoded_name,
        decoded_path,
        project_dir: project_dir.to_path_buf(),
        transcript_files,
        last_modified,
    })
}
