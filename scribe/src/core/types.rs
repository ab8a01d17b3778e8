//! Shared deterministic types for the generate-validate-retry cycle.
//!
//! These types define stable contracts between the guardrail chain, the
//! runner and the renderer. They must not depend on external state or I/O.

use serde::{Deserialize, Serialize};

/// Verdict of the guardrail chain for one generation attempt.
///
/// Rejection is an expected, frequent outcome and is modelled as a value,
/// never as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The attempt passed every check. Carries the cleaned (trimmed) text.
    Accepted(String),
    /// The attempt failed a check. Carries a human-readable reason.
    Rejected(String),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// Accepted text or rejection reason, whichever this outcome carries.
    pub fn payload(&self) -> &str {
        match self {
            Self::Accepted(text) | Self::Rejected(text) => text,
        }
    }
}

/// A rejected attempt, kept as guidance for the attempts that follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Attempt number (1-indexed).
    pub attempt: u32,
    pub reason: String,
}

/// What to do once every attempt in the budget has been rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Return the last attempt's raw text, unvalidated.
    #[default]
    FailOpen,
    /// Fail the run with a budget-exhausted error.
    Strict,
}

impl ExhaustionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailOpen => "fail_open",
            Self::Strict => "strict",
        }
    }
}

/// Text handed to the renderer once the runner is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalResult {
    /// Accepted payload, or the last raw attempt under fail-open exhaustion.
    pub raw: String,
    /// Whether `raw` passed the guardrail chain.
    pub accepted: bool,
    /// Number of generation attempts consumed.
    pub attempts: u32,
    /// Rejections in attempt order.
    pub rejections: Vec<Rejection>,
}
