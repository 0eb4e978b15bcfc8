//! Bounded retries with exponential backoff.
//!
//! [`spawn_retry`] runs an async operation on a background task and returns a
//! [`RetryHandle`]. The handle is the only way to observe the outcome and can
//! cancel the loop at any point; dropping it cancels too. The loop always ends
//! after at most [`RetryPolicy::max_attempts`] attempts.

use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::{
    sync::watch,
    task::{JoinError, JoinHandle},
    time::sleep,
};
use tracing::debug;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; at least 1.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub initial_delay: Duration,

    /// Upper bound for any single delay.
    pub max_delay: Duration,

    /// Factor applied to the delay after every failed attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);

        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    #[error("gave up after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },

    #[error("attempt {attempt} failed with a non-retryable error")]
    Fatal {
        attempt: u32,
        #[source]
        error: E,
    },

    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    #[error("retry task failed")]
    Task(#[source] JoinError),
}

/// Handle to a running retry loop.
#[derive(Debug)]
pub struct RetryHandle<T, E: std::error::Error + 'static> {
    cancel: watch::Sender<bool>,
    task: JoinHandle<Result<T, RetryError<E>>>,
}

impl<T, E: std::error::Error + 'static> RetryHandle<T, E> {
    /// Stop retrying. An attempt already in flight is allowed to finish.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Wait for the loop to finish.
    ///
    /// # Errors
    ///
    /// Returns the reason the loop ended without a successful attempt.
    pub async fn outcome(self) -> Result<T, RetryError<E>> {
        let Self { cancel, task } = self;

        let result = task.await.map_err(RetryError::Task)?;

        drop(cancel);

        result
    }
}

/// Run `operation` under `policy` on a background task.
///
/// `is_retryable` decides whether a failure is worth another attempt; anything
/// else ends the loop with [`RetryError::Fatal`].
pub fn spawn_retry<T, E, F, Fut, R>(
    policy: RetryPolicy,
    mut operation: F,
    is_retryable: R,
) -> RetryHandle<T, E>
where
    T: Send + 'static,
    E: std::error::Error + Send + 'static,
    F: FnMut(u32) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send,
    R: Fn(&E) -> bool + Send + 'static,
{
    let (cancel, mut cancelled) = watch::channel(false);

    let task = tokio::spawn(async move {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if *cancelled.borrow() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            attempt += 1;

            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !is_retryable(&error) {
                return Err(RetryError::Fatal { attempt, error });
            }

            if attempt >= max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = policy.delay_after(attempt);

            debug!(attempt, ?delay, "attempt failed, retrying: {error}");

            tokio::select! {
                () = sleep(delay) => {}
                () = wait_for_cancel(&mut cancelled) => {
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
            }
        }
    });

    RetryHandle { cancel, task }
}

async fn wait_for_cancel(cancelled: &mut watch::Receiver<bool>) {
    while !*cancelled.borrow_and_update() {
        // Sender dropped: the handle is gone, nobody can observe the outcome.
        if cancelled.changed().await.is_err() {
            return;
        }
    }
}
