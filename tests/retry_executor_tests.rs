mod common;

use common::{auth_error, network_error, rate_limit_error};
use lotusx_guard::core::types::Session;
use lotusx_guard::resilience::{
    ConnectionGuard, ErrorKind, FallbackReason, OperationResult, RetryExecutor, RetryPolicy,
};
use lotusx_guard::ExchangeError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn policy(max_attempts: u32, kinds: &[ErrorKind]) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(100),
        Duration::from_millis(800),
    )
    .with_retryable_kinds(kinds.iter().copied())
}

/// Runs `failures` then succeeds, returning the result and the instant of
/// every attempt.
async fn run_scripted(
    executor: &RetryExecutor,
    cancel: &CancellationToken,
    failures: Vec<ExchangeError>,
) -> (OperationResult<u32>, Vec<Instant>) {
    let script = Arc::new(Mutex::new(failures.into_iter()));
    let attempts = Arc::new(Mutex::new(Vec::new()));

    let result = executor
        .run("scripted", cancel, |attempt| {
            attempts.lock().unwrap().push(Instant::now());
            let next = script.lock().unwrap().next();
            async move {
                match next {
                    Some(error) => Err(error),
                    None => Ok(attempt),
                }
            }
        })
        .await;

    let attempts = attempts.lock().unwrap().clone();
    (result, attempts)
}

fn gaps(instants: &[Instant]) -> Vec<Duration> {
    instants.windows(2).map(|w| w[1] - w[0]).collect()
}

#[tokio::test(start_paused = true)]
async fn two_network_failures_then_success_backs_off_100_then_200() {
    let executor = RetryExecutor::new(policy(3, &[ErrorKind::Network]));
    let (result, attempts) = run_scripted(
        &executor,
        &CancellationToken::new(),
        vec![network_error(), network_error()],
    )
    .await;

    assert_eq!(result, OperationResult::Success(3));
    assert_eq!(attempts.len(), 3);
    assert_eq!(
        gaps(&attempts),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
}

#[tokio::test(start_paused = true)]
async fn attempts_never_exceed_max_and_delay_is_capped() {
    let executor = RetryExecutor::new(policy(6, &[ErrorKind::Network]));
    let (result, attempts) = run_scripted(
        &executor,
        &CancellationToken::new(),
        (0..10).map(|_| network_error()).collect(),
    )
    .await;

    assert_eq!(result, OperationResult::Fatal(ErrorKind::Network));
    assert_eq!(attempts.len(), 6);
    let expected: Vec<Duration> = [100, 200, 400, 800, 800]
        .into_iter()
        .map(Duration::from_millis)
        .collect();
    assert_eq!(gaps(&attempts), expected);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_kind_makes_exactly_one_attempt() {
    let executor = RetryExecutor::new(policy(5, &[ErrorKind::Network]));
    let (result, attempts) = run_scripted(
        &executor,
        &CancellationToken::new(),
        vec![rate_limit_error(), rate_limit_error()],
    )
    .await;

    assert_eq!(result, OperationResult::Fatal(ErrorKind::RateLimit));
    assert_eq!(attempts.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn not_found_never_retries() {
    let executor = RetryExecutor::new(policy(5, &ErrorKind::ALL));
    let (result, attempts) = run_scripted(
        &executor,
        &CancellationToken::new(),
        vec![ExchangeError::NotFound("no trades".to_string())],
    )
    .await;

    assert_eq!(
        result,
        OperationResult::EmptyFallback(FallbackReason::NotFound)
    );
    assert_eq!(attempts.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_is_retried_at_most_once() {
    let executor = RetryExecutor::new(policy(5, &[ErrorKind::Unknown]));
    let (result, attempts) = run_scripted(
        &executor,
        &CancellationToken::new(),
        (0..4)
            .map(|_| ExchangeError::Other("mystery".to_string()))
            .collect(),
    )
    .await;

    assert_eq!(result, OperationResult::Fatal(ErrorKind::Unknown));
    assert_eq!(attempts.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_uses_longer_backoff() {
    let executor = RetryExecutor::new(policy(3, &[ErrorKind::RateLimit]));
    let (result, attempts) = run_scripted(
        &executor,
        &CancellationToken::new(),
        vec![rate_limit_error()],
    )
    .await;

    assert_eq!(result, OperationResult::Success(2));
    assert_eq!(gaps(&attempts), vec![Duration::from_millis(200)]);
}

#[tokio::test(start_paused = true)]
async fn slow_attempt_times_out_as_network_failure() {
    let executor = RetryExecutor::new(
        policy(2, &[ErrorKind::Network]).with_attempt_timeout(Duration::from_secs(1)),
    );
    let calls = Arc::new(Mutex::new(0u32));

    let result: OperationResult<()> = executor
        .run("slow", &CancellationToken::new(), |_| {
            *calls.lock().unwrap() += 1;
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }
        })
        .await;

    assert_eq!(result, OperationResult::Fatal(ErrorKind::Network));
    assert_eq!(*calls.lock().unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_token_prevents_any_attempt() {
    let executor = RetryExecutor::new(policy(3, &[ErrorKind::Network]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (result, attempts) = run_scripted(&executor, &cancel, vec![]).await;

    assert_eq!(
        result,
        OperationResult::EmptyFallback(FallbackReason::Cancelled)
    );
    assert!(attempts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_stops_retries() {
    let executor = RetryExecutor::new(
        RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(8))
            .with_retryable_kinds([ErrorKind::Network]),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let (result, attempts) = run_scripted(
        &executor,
        &cancel,
        (0..5).map(|_| network_error()).collect(),
    )
    .await;

    assert_eq!(
        result,
        OperationResult::EmptyFallback(FallbackReason::Cancelled)
    );
    assert_eq!(attempts.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn auth_failure_invalidates_leased_session_without_retry() {
    let executor = RetryExecutor::new(RetryPolicy::default());
    let guard = ConnectionGuard::new();
    let lease = guard.set_live(Session::new("key", "test"));
    let calls = Arc::new(Mutex::new(0u32));

    let result: OperationResult<()> = executor
        .with_retry("get_balance", &guard, &lease, &CancellationToken::new(), |session| {
            *calls.lock().unwrap() += 1;
            assert_eq!(session.id, "key");
            async { Err(auth_error()) }
        })
        .await;

    assert_eq!(result, OperationResult::Fatal(ErrorKind::Auth));
    assert_eq!(*calls.lock().unwrap(), 1);
    assert!(!guard.ensure_connected());
}

#[tokio::test(start_paused = true)]
async fn late_auth_failure_does_not_drop_newer_session() {
    let executor = RetryExecutor::new(RetryPolicy::default());
    let guard = ConnectionGuard::new();
    let stale = guard.set_live(Session::new("old", "test"));
    guard.set_live(Session::new("new", "test"));

    let result: OperationResult<()> = executor
        .with_retry("get_positions", &guard, &stale, &CancellationToken::new(), |_| async {
            Err(auth_error())
        })
        .await;

    assert_eq!(result, OperationResult::Fatal(ErrorKind::Auth));
    assert_eq!(guard.current().unwrap().session().id, "new");
}
