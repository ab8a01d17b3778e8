//! Guardrail checks applied to every generation attempt.
//!
//! A [`GuardrailChain`] runs its checks in order; the first rejection wins and
//! a text that passes every check is accepted trimmed. The chain never fails:
//! - a check returning `Err` becomes a rejection naming the check;
//! - a panicking check becomes an "unexpected error" rejection.

use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::core::types::ValidationOutcome;

/// Default maximum number of words in a blog post.
pub const DEFAULT_WORD_LIMIT: usize = 100;

/// Verdict of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Pass,
    Reject(String),
}

/// A single acceptance predicate.
///
/// `Err` is reserved for failures of the check itself (e.g. the text could
/// not be inspected), not for texts that fail the predicate.
pub trait Guardrail {
    /// Short lowercase name used in error reasons (e.g. "word count").
    fn name(&self) -> &str;

    fn check(&self, text: &str) -> Result<Check>;
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Rejects texts with more than `limit` words.
#[derive(Debug, Clone, Copy)]
pub struct WordLimit {
    limit: usize,
}

impl WordLimit {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl Guardrail for WordLimit {
    fn name(&self) -> &str {
        "word count"
    }

    fn check(&self, text: &str) -> Result<Check> {
        let count = word_count(text);
        if count > self.limit {
            warn!(word_count = count, limit = self.limit, "word limit exceeded");
            return Ok(Check::Reject(format!(
                "Blog content exceeds {} words",
                self.limit
            )));
        }
        info!(word_count = count, limit = self.limit, "counted words");
        Ok(Check::Pass)
    }
}

/// Requires the first non-blank line to be a level-one Markdown heading.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleHeading;

impl Guardrail for TitleHeading {
    fn name(&self) -> &str {
        "title"
    }

    fn check(&self, text: &str) -> Result<Check> {
        let first = text.lines().map(str::trim).find(|line| !line.is_empty());
        match first {
            Some(line) if line.starts_with("# ") && line.len() > 2 => Ok(Check::Pass),
            Some(_) => Ok(Check::Reject(
                "Blog content must start with a '# Title' heading".to_string(),
            )),
            None => Ok(Check::Reject("Blog content is empty".to_string())),
        }
    }
}

/// Ordered composition of guardrails.
#[derive(Default)]
pub struct GuardrailChain {
    checks: Vec<Box<dyn Guardrail>>,
}

impl GuardrailChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain used for blog posts: word limit, then the optional title check.
    pub fn blog(word_limit: usize, require_title: bool) -> Self {
        let chain = Self::new().with(WordLimit::new(word_limit));
        if require_title {
            chain.with(TitleHeading)
        } else {
            chain
        }
    }

    pub fn with<G: Guardrail + 'static>(mut self, check: G) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Validate one attempt. Never panics and never returns an error.
    pub fn validate(&self, text: &str) -> ValidationOutcome {
        for check in &self.checks {
            let verdict = catch_unwind(AssertUnwindSafe(|| check.check(text)));
            match verdict {
                Ok(Ok(Check::Pass)) => {
                    debug!(check = check.name(), "check passed");
                }
                Ok(Ok(Check::Reject(reason))) => return ValidationOutcome::Rejected(reason),
                Ok(Err(err)) => {
                    let reason = format!("Error during {} check: {err:#}", check.name());
                    info!(check = check.name(), error = %err, "check failed to run");
                    return ValidationOutcome::Rejected(reason);
                }
                Err(panic) => {
                    let reason = format!(
                        "Unexpected error during validation: {}",
                        panic_message(panic.as_ref())
                    );
                    info!(check = check.name(), "check panicked");
                    return ValidationOutcome::Rejected(reason);
                }
            }
        }
        ValidationOutcome::Accepted(text.trim().to_string())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "unknown panic".to_string()
}
