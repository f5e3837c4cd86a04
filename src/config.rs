//! Optional TOML configuration
//!
//! ```toml
//! claude_dir = "/data/claude"
//!
//! [index]
//! refresh = "lazy"
//!
//! [text]
//! max_excerpt_chars = 300
//! extra_noise_patterns = ["^Caveat:"]
//!
//! [summary]
//! command = ["my-summarizer", "--model", "small"]
//! api_key_env = "ANTHROPIC_API_KEY"
//! api_key_file = "~/.config/session-keeper/key"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::indexer::RefreshMode;
use crate::summary::{ApiKey, CommandSummarizer};
use crate::tree::{DEFAULT_MAX_EXCERPT_CHARS, TextCleaner};
use crate::utils::get_claude_dir;

pub const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub claude_dir: Option<PathBuf>,
    pub index: IndexConfig,
    pub text: TextConfig,
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    pub refresh: RefreshMode,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub max_excerpt_chars: usize,
    pub extra_noise_patterns: Vec<String>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { max_excerpt_chars: DEFAULT_MAX_EXCERPT_CHARS, extra_noise_patterns: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryConfig {
    /// Argv of the external summarizer
    pub command: Vec<String>,
    pub api_key_env: String,
    pub api_key_file: Option<PathBuf>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { command: Vec::new(), api_key_env: DEFAULT_API_KEY_ENV.to_string(), api_key_file: None }
    }
}

impl Config {
    /// `<config dir>/session-keeper/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("session-keeper").join("config.toml"))
    }

    /// Load `path`, or the default location when `None`
    ///
    /// A missing default file means defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        match fs::read_to_string(&path) {
            Ok(text) => Self::from_toml_str(&text)
                .with_context(|| format!("Invalid configuration in {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        if config.text.max_excerpt_chars == 0 {
            bail!("text.max_excerpt_chars must be positive");
        }
        Ok(config)
    }

    /// Configured directory, else `$CLAUDE_CONFIG_DIR`, else `~/.claude`
    pub fn claude_dir(&self) -> Result<PathBuf> {
        match &self.claude_dir {
            Some(dir) => Ok(expand_tilde(dir)),
            None => get_claude_dir(),
        }
    }

    pub fn cleaner(&self) -> Result<TextCleaner> {
        TextCleaner::new(&self.text.extra_noise_patterns, self.text.max_excerpt_chars)
            .context("Invalid text.extra_noise_patterns")
    }

    /// The configured summarizer with its credential attached, if one resolves
    pub fn summarizer(&self) -> Result<CommandSummarizer> {
        let summary = &self.summary;
        let Some(summarizer) = CommandSummarizer::from_argv(&summary.command) else {
            bail!("No summarizer configured; set summary.command in the configuration file");
        };

        let key_file = summary.api_key_file.as_deref().map(expand_tilde);
        let key = ApiKey::resolve(&summary.api_key_env, key_file.as_deref())
            .context("Failed to read the API key")?;
        Ok(match key {
            Some(key) => summarizer.with_key(&summary.api_key_env, key),
            None => summarizer,
        })
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
