//! tagmerge - Annotation comparison and merge tool
//!
//! Compares independently annotated copies of the same text, aligns their
//! sentences, and merges the agreed annotations into a single document with
//! an undoable sentence-adoption workflow.

pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::TagmergeError;
