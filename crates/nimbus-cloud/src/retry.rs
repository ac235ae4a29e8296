//! Retry wrapper for conflicting concurrent operations
//!
//! Control planes reject a mutation while another one is running on the same
//! parent resource. Such rejections are transient: the call is repeated with
//! exponential backoff until it is accepted, the attempt budget runs out, or
//! the call context ends.

use crate::config::RetryConfig;
use crate::context::CallContext;
use crate::error::Result;
use std::future::Future;

/// Invoke `call` until it succeeds or fails with a non-conflict error.
///
/// Waiting between attempts observes `ctx`, so an expired or cancelled
/// context stops the loop with a timeout/cancellation error.
pub async fn retry_conflicting_operation<T, F, Fut>(
    ctx: &CallContext,
    config: &RetryConfig,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match ctx.run(call()).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                attempt += 1;
                if attempt >= max_attempts {
                    tracing::warn!("Giving up after {} conflicting attempts: {}", attempt, err);
                    return Err(err);
                }

                let delay = config.delay_for_attempt(attempt - 1);
                tracing::debug!(
                    "Attempt {}/{} hit a conflicting operation, retrying in {:?}: {}",
                    attempt,
                    max_attempts,
                    delay,
                    err
                );
                ctx.sleep(delay).await?;
            }
            Err(err) => return Err(err),
        }
    }
}
