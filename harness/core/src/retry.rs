use std::{error::Error, time::Duration};

use tokio::time::sleep;
use tracing::debug;

use crate::{shutdown::ShutdownToken, timeouts};

/// Bounded probe budget: a fixed number of attempts with a fixed wait
/// between them.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub interval: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: usize, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Suite-wide defaults, honoring env overrides.
    #[must_use]
    pub fn suite_default() -> Self {
        Self {
            max_attempts: timeouts::retry_max_attempts(),
            interval: timeouts::retry_interval(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::suite_default()
    }
}

/// Failure kinds of the probe runner.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: Error + 'static> {
    /// Every attempt failed; carries the final underlying error so the
    /// failure stays diagnosable.
    #[error("no response after {attempts} attempts, last error: {last}")]
    ExhaustedRetries {
        attempts: usize,
        #[source]
        last: E,
    },
    /// The host shut down; further attempts are meaningless.
    #[error("host shut down before the probe succeeded")]
    Cancelled,
}

/// Issue `make_request` until it returns `Ok`, the attempt budget runs out,
/// or the host-shutdown token fires. Each attempt is a fresh invocation;
/// the wait between attempts is raced against the token so cancellation is
/// observed within one interval. When cancellation and exhaustion land on
/// the same attempt, cancellation wins.
pub async fn retry_request<F, Fut, T, E>(
    mut make_request: F,
    mut token: ShutdownToken,
    policy: RetryPolicy,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Error + 'static,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0usize;

    loop {
        if token.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        attempt += 1;
        match make_request().await {
            Ok(response) => {
                debug!(attempt, "probe request succeeded");
                return Ok(response);
            }
            Err(err) => {
                debug!(attempt, max_attempts, error = %err, "probe request failed");
                if attempt >= max_attempts {
                    if token.is_cancelled() {
                        return Err(RetryError::Cancelled);
                    }
                    return Err(RetryError::ExhaustedRetries {
                        attempts: attempt,
                        last: err,
                    });
                }
            }
        }

        tokio::select! {
            () = token.cancelled() => return Err(RetryError::Cancelled),
            () = sleep(policy.interval) => {}
        }
    }
}
