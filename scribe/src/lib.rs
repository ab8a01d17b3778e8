//! Guardrailed single-agent blog writer.
//!
//! One LLM-backed agent is asked to write a short blog post. Every attempt is
//! checked by a guardrail chain and rejected attempts are retried with the
//! rejection reasons fed back as guidance, up to a fixed budget. The layout
//! mirrors a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (guardrails, outcome types, budgets).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (config files, HTTP clients,
//!   prompt templates). Hidden behind traits so tests can script them.
//!
//! Orchestration modules ([`task`], [`agent`], [`runner`], [`render`], [`app`])
//! wire core logic to I/O for the `scribe` binary.

pub mod agent;
pub mod app;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod render;
pub mod runner;
pub mod task;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
