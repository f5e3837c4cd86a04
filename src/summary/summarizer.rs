//! The summarization capability and its credential

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, IoResultExt, Result};

/// Turns a prompt into a short summary. Any failure is an [`Error::Upstream`].
pub trait Summarizer {
    fn summarize(&self, instructions: &str, prompt: &str) -> Result<String>;
}

impl<F> Summarizer for F
where
    F: Fn(&str, &str) -> Result<String>,
{
    fn summarize(&self, instructions: &str, prompt: &str) -> Result<String> {
        self(instructions, prompt)
    }
}

/// Credential for the summarization service, resolved by the caller and injected
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Read the key from `env_var`, falling back to the first line of `key_file`
    ///
    /// Blank values count as absent.
    pub fn resolve(env_var: &str, key_file: Option<&Path>) -> Result<Option<Self>> {
        if let Ok(value) = std::env::var(env_var)
            && !value.trim().is_empty()
        {
            return Ok(Some(Self(value.trim().to_string())));
        }

        let Some(path) = key_file else { return Ok(None) };
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).at(path),
        };
        Ok(content.lines().next().map(str::trim).filter(|k| !k.is_empty()).map(Self::new))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Environment variable through which [`CommandSummarizer`] passes the instructions
pub const INSTRUCTIONS_ENV: &str = "SESSION_KEEPER_INSTRUCTIONS";

/// Runs an external command: prompt on stdin, summary on stdout
#[derive(Debug, Clone)]
pub struct CommandSummarizer {
    program: String,
    args: Vec<String>,
    key: Option<(String, ApiKey)>,
}

impl CommandSummarizer {
    /// `argv[0]` is the program. `None` if `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self { program: program.clone(), args: args.to_vec(), key: None })
    }

    /// Expose `key` to the command as `env_var`
    pub fn with_key(mut self, env_var: impl Into<String>, key: ApiKey) -> Self {
        self.key = Some((env_var.into(), key));
        self
    }
}

impl Summarizer for CommandSummarizer {
    fn summarize(&self, instructions: &str, prompt: &str) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env(INSTRUCTIONS_ENV, instructions)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some((env_var, key)) = &self.key {
            cmd.env(env_var, key.expose());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Upstream(format!("failed to start `{}`: {}", self.program, e)))?;
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(prompt.as_bytes()) {
                // The command may answer without reading all of its input
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                    return Err(Error::Upstream(format!("failed to send prompt: {}", e)));
                }
                _ => {}
            }
        }
        let output = child
            .wait_with_output()
            .map_err(|e| Error::Upstream(format!("`{}` did not finish: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Upstream(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        debug!("Summarizer returned {} bytes", output.stdout.len());
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
