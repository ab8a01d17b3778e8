//! Stable exit codes for the `scribe` binary.

/// A result was printed (accepted, or returned fail-open after exhaustion).
pub const OK: i32 = 0;
/// Fatal error: configuration, credentials, LLM or search failure.
pub const FAILED: i32 = 1;
/// Every attempt was rejected and the exhaustion policy is `strict`.
pub const EXHAUSTED: i32 = 2;
