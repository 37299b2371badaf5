//! Bounded retry for store connections

use bus::Shutdown;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Retry outcome when no attempt succeeded
#[derive(Debug, Error)]
pub enum RetryError {
    /// Every attempt failed
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        last: anyhow::Error,
    },

    /// Shutdown fired before an attempt succeeded
    #[error("Retry cancelled by shutdown")]
    Cancelled,
}

/// Run `op` until it succeeds, at most `attempts` times, pausing `delay`
/// between attempts
///
/// Every failure is treated as transient. A budget of zero still makes one
/// attempt.
pub async fn retry<T, F, Fut>(
    attempts: u32,
    delay: Duration,
    shutdown: &Shutdown,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let budget = attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Err(RetryError::Cancelled),
            result = op() => result,
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    info!(attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt >= budget => {
                error!(attempts = attempt, error = %e, "Retry budget exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = budget,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => return Err(RetryError::Cancelled),
                    () = sleep(delay) => {}
                }
            }
        }
    }
}
