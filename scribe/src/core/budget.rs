//! Wall-clock budget helpers for the whole run.

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};

/// Return the remaining time budget until the provided deadline.
pub fn remaining_budget(deadline: Instant) -> Result<Duration> {
    let remaining = deadline
        .checked_duration_since(Instant::now())
        .unwrap_or(Duration::from_secs(0));
    if remaining.is_zero() {
        return Err(anyhow!("run timed out"));
    }
    Ok(remaining)
}

/// Check an optional deadline; `None` means the run is unbounded.
pub fn ensure_within(deadline: Option<Instant>) -> Result<()> {
    match deadline {
        Some(deadline) => remaining_budget(deadline).map(|_| ()),
        None => Ok(()),
    }
}
