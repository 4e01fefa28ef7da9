use crate::core::errors::ExchangeError;
use crate::core::types::Session;
use crate::resilience::{
    classifier::{classify, ErrorKind},
    fallback::{FallbackReason, OperationResult},
    guard::{ConnectionGuard, SessionLease},
    policy::RetryPolicy,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Retry(Duration),
    Stop(Terminal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    NotFound,
    Fatal(ErrorKind),
}

/// Runs remote operations with classified, bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `op` until it succeeds, fails with a non-retryable kind, runs
    /// out of attempts, or `cancel` fires.
    ///
    /// `op` receives the 1-based attempt number. Each call is bounded by the
    /// policy's attempt timeout; an elapsed timeout counts as a network
    /// failure.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> OperationResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
    {
        let mut attempt: u32 = 0;
        let mut unknown_retried = false;

        loop {
            if cancel.is_cancelled() {
                debug!(operation, attempt, "Cancelled before next attempt");
                return OperationResult::EmptyFallback(FallbackReason::Cancelled);
            }

            attempt += 1;
            let call = tokio::time::timeout(self.policy.attempt_timeout, op(attempt));
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(operation, attempt, "Cancelled during attempt");
                    return OperationResult::EmptyFallback(FallbackReason::Cancelled);
                }
                result = call => result.unwrap_or_else(|_| {
                    Err(ExchangeError::Timeout(self.policy.attempt_timeout.as_millis() as u64))
                }),
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Succeeded after retry");
                    }
                    return OperationResult::Success(value);
                }
                Err(error) => error,
            };

            let kind = classify(&error);
            match self.next_step(kind, attempt, &mut unknown_retried) {
                Step::Stop(Terminal::NotFound) => {
                    debug!(operation, attempt, error = %error, "Remote reported not found");
                    return OperationResult::EmptyFallback(FallbackReason::NotFound);
                }
                Step::Stop(Terminal::Fatal(kind)) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        kind = %kind,
                        error = %error,
                        "Giving up on operation"
                    );
                    return OperationResult::Fatal(kind);
                }
                Step::Retry(delay) => {
                    log_retry(operation, kind, attempt, delay, &error);
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            debug!(operation, attempt, "Cancelled during backoff");
                            return OperationResult::EmptyFallback(FallbackReason::Cancelled);
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Session-bound form of [`run`](Self::run): `op` receives the leased
    /// session on every attempt, and a final `Auth` failure invalidates that
    /// session in `guard`.
    pub async fn with_retry<T, F, Fut>(
        &self,
        operation: &str,
        guard: &ConnectionGuard,
        lease: &SessionLease,
        cancel: &CancellationToken,
        mut op: F,
    ) -> OperationResult<T>
    where
        F: FnMut(Arc<Session>) -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
    {
        let result = self
            .run(operation, cancel, |_| op(Arc::clone(lease.session())))
            .await;

        if let OperationResult::Fatal(kind) = result {
            if kind.is_fatal_for_session() && guard.invalidate(lease) {
                error!(
                    operation,
                    session_id = %lease.session().id,
                    generation = lease.generation(),
                    "Credentials rejected, session invalidated; check API key configuration"
                );
            }
        }

        result
    }

    fn next_step(&self, kind: ErrorKind, attempt: u32, unknown_retried: &mut bool) -> Step {
        if kind == ErrorKind::NotFound {
            return Step::Stop(Terminal::NotFound);
        }
        // Auth ends the call even under a policy that lists it as retryable
        if kind.is_fatal_for_session()
            || !self.policy.is_retryable(kind)
            || attempt >= self.policy.max_attempts
        {
            return Step::Stop(Terminal::Fatal(kind));
        }
        if kind == ErrorKind::Unknown {
            if *unknown_retried {
                return Step::Stop(Terminal::Fatal(kind));
            }
            *unknown_retried = true;
        }
        Step::Retry(self.policy.backoff_delay(attempt, kind))
    }
}

fn log_retry(operation: &str, kind: ErrorKind, attempt: u32, delay: Duration, error: &ExchangeError) {
    let delay_ms = delay.as_millis() as u64;
    match kind {
        ErrorKind::Network | ErrorKind::RateLimit => {
            info!(operation, attempt, kind = %kind, delay_ms, error = %error, "Attempt failed, retrying");
        }
        ErrorKind::Auth | ErrorKind::NotFound | ErrorKind::Unknown => {
            warn!(operation, attempt, kind = %kind, delay_ms, error = %error, "Attempt failed, retrying");
        }
    }
}
