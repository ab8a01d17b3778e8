//! Deterministic, pure logic shared by the writer.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod budget;
pub mod guardrail;
pub mod types;
