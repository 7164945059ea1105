//! Unified-diff parsing and pre-review filtering.
//!
//! Turns raw diff text into per-file change records with line-number anchors,
//! then filters out files that should never reach the completion service
//! (deletions and configured exclusion patterns).

pub mod filter;
pub mod parser;
