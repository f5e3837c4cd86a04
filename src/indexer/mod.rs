//! Keeping project indexes in step with their transcripts
//!
//! # Error Handling Strategy
//!
//! - **Per-transcript failures**: a transcript that cannot be stat'ed or scanned is
//!   logged and left stale; the rest of the project is still reconciled.
//! - **Project-level failures**: an unreadable project directory, or an index that
//!   cannot be written, is returned to the caller.
//! - **Listings**: a failed repair never fails a listing; stale sessions are
//!   flagged instead.

pub mod listing;
pub mod project_discovery;
pub mod reconciler;
pub mod scanner;

pub use listing::{RefreshMode, list_messages, list_sessions, load_tree};
pub use project_discovery::list_projects;
pub use reconciler::{
    IndexReport, RepairReport, StaleReason, StaleSession, check_index, rebuild_index, repair_index,
    transcript_files,
};
pub use scanner::{SessionScan, scan_session};
