//! Core types, configuration, and error handling for kestrel.
//!
//! This crate provides the shared foundation used by the other kestrel crates:
//! - [`KestrelError`] — unified error type using `thiserror`
//! - [`KestrelConfig`] — configuration loaded from `.kestrel.toml` and the environment
//! - Shared types: [`PullRequestInfo`], [`DiffChunk`], [`DiffLine`], [`LineKind`],
//!   [`FeedbackComment`]

pub mod config;
mod error;
mod types;

pub use config::{KestrelConfig, LlmConfig, ReviewSettings};
pub use error::KestrelError;
pub use types::{DiffChunk, DiffLine, FeedbackComment, LineKind, PullRequestInfo};

/// A convenience `Result` type for kestrel operations.
pub type Result<T> = std::result::Result<T, KestrelError>;
