//! Edits that rewrite a transcript in place

pub mod deletion;

pub use deletion::{DeletionOutcome, delete_from};
