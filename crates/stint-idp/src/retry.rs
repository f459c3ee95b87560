//! Generic retry with exponential backoff.
//!
//! One loop, two stop conditions: a fixed attempt budget for cheap one-off
//! calls and an elapsed-time budget for work that sits on the request path
//! and must never hold a caller past a deadline. Retry placement is always
//! the caller's decision; nothing in this crate retries implicitly.

use std::time::{Duration, Instant};

use crate::error::{Result, is_retryable};

// ─────────────────────────────────────────────────────────────────────────────
// Stop Conditions
// ─────────────────────────────────────────────────────────────────────────────

/// When a retry loop stops rescheduling failed attempts.
enum StopAfter {
    /// Stop once the operation has run `max_retries + 1` times.
    Attempts(u32),
    /// Stop once the elapsed time reaches the budget.
    Elapsed { budget: Duration, started: Instant },
}

impl StopAfter {
    fn exhausted(&self, attempt: u32) -> bool {
        match self {
            Self::Attempts(max_retries) => attempt >= *max_retries,
            Self::Elapsed { budget, started } => started.elapsed() >= *budget,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Execute an async operation with exponential backoff retry.
///
/// The operation runs at most `max_retries + 1` times. Non-retryable errors
/// are returned immediately without any delay; retryable errors back off
/// `base_delay * 2^attempt` between runs.
pub async fn retry_with_backoff<F, Fut, T>(
    max_retries: u32,
    base_delay: Duration,
    op_name: &str,
    f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    retry_loop(StopAfter::Attempts(max_retries), base_delay, None, op_name, f).await
}

/// Execute an async operation repeatedly until a time budget is spent.
///
/// Attempts keep going while the elapsed time is below `budget`, with the
/// same doubling backoff capped at `max_delay` per step. A non-retryable
/// error still stops the loop immediately, so a terminal outcome is surfaced
/// on the first attempt that produces it.
pub async fn retry_for<F, Fut, T>(
    budget: Duration,
    base_delay: Duration,
    max_delay: Duration,
    op_name: &str,
    f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let stop = StopAfter::Elapsed {
        budget,
        started: Instant::now(),
    };
    retry_loop(stop, base_delay, Some(max_delay), op_name, f).await
}

async fn retry_loop<F, Fut, T>(
    stop: StopAfter,
    base_delay: Duration,
    max_delay: Option<Duration>,
    op_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut delay = base_delay;
    let mut attempt: u32 = 0;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !is_retryable(&e) {
                    return Err(e);
                }
                if stop.exhausted(attempt) {
                    return Err(e);
                }

                tracing::warn!(
                    operation = op_name,
                    attempt = attempt + 1,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;

                delay = delay.saturating_mul(2);
                if let Some(cap) = max_delay {
                    delay = delay.min(cap);
                }
                attempt += 1;
            }
        }
    }
}
