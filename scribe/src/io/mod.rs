//! I/O collaborators for the writer.

pub mod config;
pub mod llm;
pub mod prompt;
pub mod search;
