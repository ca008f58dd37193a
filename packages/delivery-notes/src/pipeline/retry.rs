//! Bounded retries with exponential backoff around one model call.
//!
//! Each attempt either succeeds, produces a usable but unsatisfying value
//! (kept as a fallback while further attempts run), or fails. Permanent
//! failures stop the loop at once.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ExtractionError;

/// Attempt bounds and backoff schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
            multiplier: 2.0,
        }
    }
}

/// What one attempt produced.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Accept and stop
    Done(T),
    /// Usable, but try again; the reason is logged
    Unsatisfied(T, String),
}

/// Value returned by a finished retry loop.
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
    /// False when every attempt was `Unsatisfied` and the last one was kept
    pub satisfied: bool,
}

/// Failure of a whole retry loop.
#[derive(Debug)]
pub struct Exhausted {
    pub attempts: u32,
    pub error: ExtractionError,
}

impl RetryPolicy {
    /// Same bounds without waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1.0,
        }
    }

    /// At least one attempt always runs.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait before attempt `attempt + 1`, after `attempt` (1-based) failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(millis.max(0.0) as u64)
    }

    /// Run `op` until it returns `Done`, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<Attempted<T>, Exhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = crate::error::Result<Outcome<T>>>,
    {
        let max = self.attempts();
        let mut fallback: Option<T> = None;
        let mut last_error: Option<ExtractionError> = None;

        for attempt in 1..=max {
            match op(attempt).await {
                Ok(Outcome::Done(value)) => {
                    debug!(attempt, "Attempt succeeded");
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                        satisfied: true,
                    });
                }
                Ok(Outcome::Unsatisfied(value, reason)) => {
                    warn!(attempt, max_attempts = max, reason = %reason, "Attempt unsatisfied, retrying");
                    fallback = Some(value);
                }
                Err(error) if !error.is_retryable() => {
                    warn!(attempt, error = %error, "Permanent failure, not retrying");
                    return Err(Exhausted {
                        attempts: attempt,
                        error,
                    });
                }
                Err(error) => {
                    warn!(attempt, max_attempts = max, error = %error, "Attempt failed, retrying");
                    last_error = Some(error);
                }
            }

            if attempt < max {
                let delay = self.delay_for(attempt);
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
        }

        match (fallback, last_error) {
            (Some(value), _) => Ok(Attempted {
                value,
                attempts: max,
                satisfied: false,
            }),
            (None, Some(error)) => Err(Exhausted {
                attempts: max,
                error,
            }),
            (None, None) => Err(Exhausted {
                attempts: 0,
                error: ExtractionError::Config("retry policy ran no attempts".into()),
            }),
        }
    }
}
