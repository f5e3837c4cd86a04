use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable the assistant CLI itself uses to relocate its data
pub const CLAUDE_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

/// Get the Claude directory path (`$CLAUDE_CONFIG_DIR`, else `~/.claude`)
pub fn get_claude_dir() -> Result<PathBuf> {
    resolve_claude_dir(env::var_os(CLAUDE_DIR_ENV).map(PathBuf::from), env::var_os("HOME").map(PathBuf::from))
}

pub(crate) fn resolve_claude_dir(override_dir: Option<PathBuf>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = override_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }
    let home = home
        .filter(|h| !h.as_os_str().is_empty())
        .or_else(dirs::home_dir)
        .context("HOME environment variable not set")?;
    Ok(home.join(".claude"))
}
