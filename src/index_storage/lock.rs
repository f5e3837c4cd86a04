//! Per-project serialization of index read-modify-write cycles
//!
//! Two layers: an in-process mutex per project directory, so threads of this
//! process queue up, and an advisory exclusive file lock next to the index, so
//! other processes using this crate queue up as well. The file lock is released
//! when the handle is dropped.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use fs4::fs_std::FileExt;
use tracing::debug;

use crate::error::{IoResultExt, Result};
use crate::utils::INDEX_FILENAME;

type Registry = Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>;

fn registry() -> &'static Registry {
    static LOCKS: OnceLock<Registry> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn project_mutex(project_dir: &Path) -> Arc<Mutex<()>> {
    let key = project_dir.canonicalize().unwrap_or_else(|_| project_dir.to_path_buf());
    let mut locks = registry().lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(key).or_default().clone()
}

pub fn lock_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(format!("{}.lock", INDEX_FILENAME))
}

fn acquire_file_lock(project_dir: &Path) -> Result<File> {
    let path = lock_file_path(project_dir);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&path)
        .at(&path)?;
    FileExt::lock_exclusive(&file).at(&path)?;
    debug!("Acquired index lock {}", path.display());
    Ok(file)
}

/// Run `f` while holding exclusive access to `project_dir`'s index
pub fn with_project_lock<R>(project_dir: &Path, f: impl FnOnce() -> Result<R>) -> Result<R> {
    let mutex = project_mutex(project_dir);
    let _guard = mutex.lock().unwrap_or_else(PoisonError::into_inner);
    let _file_lock = acquire_file_lock(project_dir)?;
    f()
}
