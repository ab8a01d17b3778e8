//! Generate-validate-retry loop.
//!
//! [`run_task`] asks a [`Generator`] for attempts one at a time, runs each
//! through the guardrail chain, and feeds every rejection reason back into
//! the next attempt. Generator errors are never retried.

use std::fmt;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use crate::core::budget::ensure_within;
use crate::core::guardrail::GuardrailChain;
use crate::core::types::{ExhaustionPolicy, FinalResult, Rejection, ValidationOutcome};
use crate::task::TaskPrompt;

/// Everything a generator sees for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct AttemptRequest<'a> {
    /// Attempt number (1-indexed).
    pub attempt: u32,
    pub prompt: &'a TaskPrompt,
    /// Rejections from all earlier attempts, oldest first.
    pub guidance: &'a [Rejection],
}

/// Source of generation attempts (the agent, or a scripted double in tests).
pub trait Generator {
    fn generate(&self, request: &AttemptRequest<'_>) -> Result<String>;
}

/// Budget and policy for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Total attempts allowed (≥ 1).
    pub max_attempts: u32,
    pub policy: ExhaustionPolicy,
    /// Wall-clock budget for the whole run.
    pub timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            policy: ExhaustionPolicy::FailOpen,
            timeout: None,
        }
    }
}

/// Reported to the caller after every attempt.
#[derive(Debug, Clone, Copy)]
pub struct AttemptReport<'a> {
    pub attempt: u32,
    pub max_attempts: u32,
    pub outcome: &'a ValidationOutcome,
}

/// Every attempt was rejected and the policy is [`ExhaustionPolicy::Strict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetExhaustedError {
    pub attempts: u32,
    pub last_reason: String,
}

impl fmt::Display for BudgetExhaustedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "validation budget exhausted after {} attempt(s): {}",
            self.attempts, self.last_reason
        )
    }
}

impl std::error::Error for BudgetExhaustedError {}

/// Drive `generator` until `guardrail` accepts or the budget runs out.
///
/// Returns the accepted payload, or under fail-open exhaustion the last
/// attempt's raw text with `accepted = false`.
#[instrument(skip_all, fields(max_attempts = options.max_attempts, policy = options.policy.as_str()))]
pub fn run_task<G: Generator, F: FnMut(&AttemptReport<'_>)>(
    generator: &G,
    prompt: &TaskPrompt,
    guardrail: &GuardrailChain,
    options: &RunOptions,
    mut on_attempt: F,
) -> Result<FinalResult> {
    if options.max_attempts == 0 {
        bail!("max_attempts must be > 0");
    }
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);

    let mut rejections: Vec<Rejection> = Vec::new();
    let mut last_raw = String::new();
    for attempt in 1..=options.max_attempts {
        ensure_within(deadline)?;

        let request = AttemptRequest {
            attempt,
            prompt,
            guidance: &rejections,
        };
        let raw = generator
            .generate(&request)
            .with_context(|| format!("generation attempt {attempt}"))?;

        let outcome = guardrail.validate(&raw);
        on_attempt(&AttemptReport {
            attempt,
            max_attempts: options.max_attempts,
            outcome: &outcome,
        });

        match outcome {
            ValidationOutcome::Accepted(cleaned) => {
                info!(attempt, "attempt accepted");
                return Ok(FinalResult {
                    raw: cleaned,
                    accepted: true,
                    attempts: attempt,
                    rejections,
                });
            }
            ValidationOutcome::Rejected(reason) => {
                warn!(attempt, reason = %reason, "attempt rejected");
                rejections.push(Rejection { attempt, reason });
                last_raw = raw;
            }
        }
    }

    let last_reason = rejections
        .last()
        .map(|rejection| rejection.reason.clone())
        .unwrap_or_default();
    match options.policy {
        ExhaustionPolicy::FailOpen => {
            warn!(
                attempts = options.max_attempts,
                "validation budget exhausted; returning last attempt unvalidated"
            );
            Ok(FinalResult {
                raw: last_raw,
                accepted: false,
                attempts: options.max_attempts,
                rejections,
            })
        }
        ExhaustionPolicy::Strict => Err(BudgetExhaustedError {
            attempts: options.max_attempts,
            last_reason,
        }
        .into()),
    }
}
