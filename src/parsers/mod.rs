//! JSONL parser for session transcripts
//!
//! # Error Handling Strategy
//!
//! Transcripts are appended to by another process while we read them, so every
//! line is parsed on its own and a bad line never aborts the file:
//!
//! - **Blank lines** and **lines without an identity** (snapshots, summaries) are
//!   skipped silently.
//! - **Malformed lines** (invalid JSON, invalid UTF-8, wrong field types) are logged
//!   with `tracing::warn!` and skipped.
//! - **Malformed fields** that are not required (timestamps, flags, message bodies)
//!   degrade to `None`/`false` instead of dropping the record.
//!
//! Only failing to open the file is reported to the caller.

pub mod deserializers;
pub mod transcript;

pub use transcript::{LineOutcome, Transcript, TranscriptRecords, parse_line, parse_transcript};
