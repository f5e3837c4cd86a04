//! Session Keeper - keep assistant transcripts and their session indexes consistent
//!
//! The assistant CLI stores each conversation as an append-only JSONL transcript
//! under `~/.claude/projects/<encoded project>/`, next to a `sessions-index.json`
//! that caches titles, message counts and timestamps. This library:
//!
//! - Parses transcripts into a message tree, tolerating malformed and partial lines
//! - Checks the index against the transcripts and repairs stale entries
//! - Deletes a message together with all of its descendants, atomically
//! - Merges externally generated summaries into the index
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use session_keeper::{RefreshMode, TextCleaner, list_sessions};
//!
//! let project = Path::new("/Users/alice/.claude/projects/-Users-alice-app");
//! for session in list_sessions(project, RefreshMode::Eager, &TextCleaner::default())? {
//!     println!("{} {}", session.session_id, session.display_title());
//! }
//! # Ok::<(), session_keeper::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod editing;
pub mod error;
pub mod index_storage;
pub mod indexer;
pub mod models;
pub mod parsers;
pub mod summary;
pub mod tree;
pub mod utils;

// Re-export commonly used types
pub use editing::{DeletionOutcome, delete_from};
pub use error::{Error, Result};
pub use index_storage::{IndexEntryPatch, load_index, save_index, update_index, upsert_entry};
pub use indexer::{RefreshMode, check_index, list_messages, list_projects, list_sessions, repair_index};
pub use models::{IndexEntry, MessageRecord, SessionInfo, SessionsIndex};
pub use parsers::parse_transcript;
pub use summary::{Summarizer, generate_and_merge_summary, merge_summary};
pub use tree::{MessageTree, TextCleaner};
pub use utils::paths::{decode_project_dir_name, format_path_with_tilde};
