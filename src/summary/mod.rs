//! Session summaries stored as the index entry's `customTitle`
//!
//! The summarizer is an injected [`Summarizer`]; its credential is resolved by
//! the caller and never read here.

pub mod merge;
pub mod prompt;
pub mod summarizer;

pub use merge::{generate_and_merge_summary, merge_summary};
pub use prompt::{SUMMARY_INSTRUCTIONS, build_prompt, summary_excerpts};
pub use summarizer::{ApiKey, CommandSummarizer, Summarizer};
