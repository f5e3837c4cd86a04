//! Data models for transcripts and the per-project session index.
//!
//! - [`MessageRecord`] - one identified line of a transcript
//! - [`MessageContent`] / [`ContentBlock`] - the `message.content` union
//! - [`SessionsIndex`] / [`IndexEntry`] - the on-disk `sessions-index.json` schema
//! - [`SessionInfo`] - a session as listed to callers
//! - [`ProjectInfo`] - a discovered project directory
//!
//! Lenient field deserializers live in `parsers::deserializers`.

pub mod index;
pub mod message;
pub mod project;
pub mod session;

pub use index::{INDEX_VERSION, IndexEntry, SessionsIndex};
pub use message::{ContentBlock, MessageContent, MessageRecord, MessageType};
pub use project::ProjectInfo;
pub use session::SessionInfo;
