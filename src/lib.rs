//! Split a PDF book into one PDF per chapter.
//!
//! Chapter ranges come from the outline, a text-generation model, or
//! user-typed ranges, and are written out after reconciling printed page
//! numbers with physical page positions.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;

#[cfg(test)]
mod test_support;

pub use error::ChapterError;
pub use models::{ChapterPartition, ChapterRange};
