//! The diff-to-feedback review pipeline.
//!
//! Decodes the triggering webhook event, builds one self-contained prompt per
//! diff chunk, sends it to the completion service, maps the returned findings
//! onto absolute file/line coordinates, and aggregates everything into a
//! single review submission.

pub mod event;
pub mod github;
pub mod llm;
pub mod mapper;
pub mod pipeline;
pub mod prompt;
