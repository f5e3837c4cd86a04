//! Per-project `sessions-index.json` storage
//!
//! The index is a cache over the transcripts in a project directory. Loading
//! never fails on a bad file; every write goes through [`update_index`], which
//! holds the project lock for the whole read-modify-write.

pub mod entry;
pub mod lock;
pub mod persistence;

pub use entry::{IndexEntryPatch, Upsert, remove_entry, upsert_entry};
pub use lock::with_project_lock;
pub use persistence::{IndexState, load_index, load_index_with_state, save_index, update_index};
