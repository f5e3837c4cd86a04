//! Error taxonomy for the transcript and index engine
//!
//! Line-level parse problems and a corrupt index file are recovered where they
//! happen (logged and skipped, or treated as an absent index), so they have no
//! variant here. Everything that reaches a caller is one of the variants below.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Deletion target is not a message of the transcript
    #[error("message {uuid} not found in {}", path.display())]
    NotFound { path: PathBuf, uuid: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize index: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The summarizer failed or answered with nothing usable
    #[error("summarization failed: {0}")]
    Upstream(String),

    #[error("no user messages found in {}", .0.display())]
    NoUserMessages(PathBuf),

    /// The external writer touched the transcript while it was being rewritten
    #[error("transcript {} changed while it was being rewritten, retry the operation", .0.display())]
    TranscriptChanged(PathBuf),

    #[error("invalid noise pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Attach the offending path to an `io::Error`
pub(crate) trait IoResultExt<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Io { path: path.to_path_buf(), source })
    }
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = Err::<(), _>(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            .at(Path::new("/tmp/session.jsonl"))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/tmp/session.jsonl"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_not_found_predicate() {
        let err = Error::NotFound { path: PathBuf::from("a.jsonl"), uuid: "x".to_string() };
        assert!(err.is_not_found());
        assert!(!Error::Upstream("boom".to_string()).is_not_found());
    }
}
