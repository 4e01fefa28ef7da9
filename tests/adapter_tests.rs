mod common;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::{auth_error, network_error, ScriptedTransport};
use futures::future::join_all;
use lotusx_guard::{
    ErrorKind, ExchangeError, Price, Quantity, ResilientAdapter, RetryPolicy, Symbol, Trade,
    TradeSide,
};
use rust_decimal::Decimal;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(100), Duration::from_millis(800))
}

fn adapter(transport: ScriptedTransport) -> ResilientAdapter<ScriptedTransport> {
    ResilientAdapter::new(transport, fast_policy())
}

async fn connected(transport: ScriptedTransport) -> ResilientAdapter<ScriptedTransport> {
    let adapter = adapter(transport);
    assert!(adapter.healthcheck().await);
    adapter
}

fn trade_at(id: i64, time: i64) -> Trade {
    Trade {
        symbol: Symbol::new("BTC", "USDT").unwrap(),
        id,
        order_id: id * 10,
        side: TradeSide::Buy,
        price: Price::new(Decimal::from(42_000)),
        quantity: Quantity::new(Decimal::ONE),
        commission: Decimal::ZERO,
        commission_asset: "USDT".to_string(),
        realized_pnl: Decimal::ZERO,
        is_maker: false,
        time,
    }
}

#[tokio::test]
async fn absent_session_returns_empty_values_without_remote_calls() {
    let adapter = adapter(ScriptedTransport::new().with_balance("USDT", 100));
    let now = Utc::now();

    assert!(!adapter.is_connected());
    assert!(adapter.get_balance().await.is_empty());
    assert!(adapter.get_positions().await.is_empty());
    assert!(adapter
        .get_trades_by_timeframe(now - ChronoDuration::hours(1), now)
        .await
        .is_empty());

    let calls = &adapter.transport().calls;
    assert_eq!(calls.remote_fetches(), 0);
    assert_eq!(ScriptedTransport::count(&calls.connect), 0);
}

#[tokio::test]
async fn healthcheck_connects_absent_session() {
    let adapter = adapter(ScriptedTransport::new());

    assert!(adapter.healthcheck().await);
    assert!(adapter.is_connected());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.connect), 1);

    // A live session is pinged rather than reconnected
    assert!(adapter.healthcheck().await);
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.connect), 1);
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.ping), 1);
}

#[tokio::test(start_paused = true)]
async fn healthcheck_retries_transient_connect_failures() {
    let adapter = adapter(ScriptedTransport::new().fail_connect([network_error()]));

    assert!(adapter.healthcheck().await);
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.connect), 2);
}

#[tokio::test]
async fn healthcheck_reports_false_when_credentials_rejected() {
    let adapter = adapter(ScriptedTransport::new().fail_connect([auth_error()]));

    assert!(!adapter.healthcheck().await);
    assert!(!adapter.is_connected());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.connect), 1);
}

#[tokio::test]
async fn successful_balance_is_returned_unchanged() {
    let adapter = connected(ScriptedTransport::new().with_balance("USDT", 250)).await;

    let balances = adapter.get_balance().await;
    assert_eq!(balances.len(), 1);
    assert_eq!(balances["USDT"].free.value(), Decimal::from(250));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_transparently() {
    let adapter = connected(
        ScriptedTransport::new()
            .with_balance("BTC", 2)
            .fail_balance([network_error(), network_error()]),
    )
    .await;

    let balances = adapter.get_balance().await;
    assert_eq!(balances["BTC"].free.value(), Decimal::from(2));
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.balance), 3);
    assert!(adapter.is_connected());
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fall_back_to_empty_and_keep_session() {
    let adapter = connected(
        ScriptedTransport::new()
            .with_balance("BTC", 2)
            .fail_positions((0..5).map(|_| network_error())),
    )
    .await;

    assert!(adapter.get_positions().await.is_empty());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.positions), 3);
    assert!(adapter.is_connected());
}

#[tokio::test]
async fn auth_failure_invalidates_session_and_falls_back() {
    let adapter = connected(
        ScriptedTransport::new()
            .with_balance("USDT", 100)
            .fail_balance([auth_error()]),
    )
    .await;

    assert!(adapter.get_balance().await.is_empty());
    assert!(!adapter.is_connected());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.balance), 1);

    // Further calls are guarded out until a healthcheck reconnects
    assert!(adapter.get_positions().await.is_empty());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.positions), 0);

    assert!(adapter.healthcheck().await);
    assert_eq!(adapter.get_balance().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn auth_failure_drops_session_even_when_policy_lists_auth_retryable() {
    let policy = fast_policy().with_retryable_kinds([ErrorKind::Network, ErrorKind::Auth]);
    let adapter = ResilientAdapter::new(
        ScriptedTransport::new()
            .with_balance("USDT", 100)
            .fail_balance([auth_error(), network_error(), network_error()]),
        policy,
    );
    assert!(adapter.healthcheck().await);

    assert!(adapter.get_balance().await.is_empty());
    assert!(!adapter.is_connected());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.balance), 1);
}

#[tokio::test]
async fn healthcheck_ping_auth_failure_drops_session() {
    let adapter = connected(ScriptedTransport::new().fail_ping([auth_error()])).await;

    assert!(!adapter.healthcheck().await);
    assert!(!adapter.is_connected());
}

#[tokio::test]
async fn healthcheck_ping_network_failure_keeps_session() {
    let adapter = connected(ScriptedTransport::new().fail_ping([network_error()])).await;

    assert!(!adapter.healthcheck().await);
    assert!(adapter.is_connected());
}

#[tokio::test]
async fn not_found_trades_are_empty_without_retry() {
    let adapter = connected(
        ScriptedTransport::new().fail_trades([ExchangeError::NotFound("no fills".to_string())]),
    )
    .await;
    let now = Utc::now();

    let trades = adapter
        .get_trades_by_timeframe(now - ChronoDuration::days(1), now)
        .await;
    assert!(trades.is_empty());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.trades), 1);
    assert!(adapter.is_connected());
}

#[tokio::test]
async fn trades_are_filtered_by_timeframe() {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
    let inside = start.timestamp_millis() + 1_000;
    let outside = end.timestamp_millis() + 1_000;
    let adapter = connected(
        ScriptedTransport::new().with_trades(vec![trade_at(1, inside), trade_at(2, outside)]),
    )
    .await;

    let trades = adapter.get_trades_by_timeframe(start, end).await;
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].id, 1);
}

#[tokio::test]
async fn inverted_timeframe_is_empty_without_remote_call() {
    let adapter = connected(ScriptedTransport::new()).await;
    let now = Utc::now();

    let trades = adapter
        .get_trades_by_timeframe(now, now - ChronoDuration::hours(1))
        .await;
    assert!(trades.is_empty());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.trades), 0);
}

#[tokio::test]
async fn disconnect_clears_session_and_releases_remote() {
    let adapter = connected(ScriptedTransport::new().with_balance("USDT", 1)).await;

    adapter.disconnect().await;
    assert!(!adapter.is_connected());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.disconnect), 1);
    assert!(adapter.get_balance().await.is_empty());

    // Disconnecting twice is a no-op
    adapter.disconnect().await;
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.disconnect), 1);
}

#[tokio::test]
async fn concurrent_healthchecks_connect_once() {
    let adapter = adapter(ScriptedTransport::new());

    let results = join_all((0..8).map(|_| adapter.healthcheck())).await;
    assert!(results.into_iter().all(|live| live));
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.connect), 1);
}

#[tokio::test]
async fn concurrent_reads_share_the_session() {
    let adapter = connected(ScriptedTransport::new().with_balance("ETH", 5)).await;

    let results = join_all((0..16).map(|_| adapter.get_balance())).await;
    assert!(results.iter().all(|b| b["ETH"].free.value() == Decimal::from(5)));
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.balance), 16);
}

#[tokio::test(start_paused = true)]
async fn cancelled_call_returns_empty_and_keeps_session() {
    let adapter = connected(
        ScriptedTransport::new()
            .with_balance("USDT", 1)
            .fail_balance((0..3).map(|_| network_error())),
    )
    .await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(adapter.get_balance_with_cancel(&cancel).await.is_empty());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.balance), 0);
    assert!(adapter.is_connected());
}

#[tokio::test]
async fn shutdown_stops_plain_operations() {
    let adapter = connected(ScriptedTransport::new().with_balance("USDT", 1)).await;

    adapter.shutdown();
    assert!(adapter.get_balance().await.is_empty());
    assert_eq!(ScriptedTransport::count(&adapter.transport().calls.balance), 0);
}

#[test]
fn builder_rejects_invalid_policy() {
    let result = ResilientAdapter::builder(ScriptedTransport::new())
        .with_policy(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO))
        .build();
    assert!(result.is_err());
}

#[test]
fn builder_rejects_auth_as_retryable() {
    let result = ResilientAdapter::builder(ScriptedTransport::new())
        .with_policy(fast_policy().with_retryable_kinds([ErrorKind::Network, ErrorKind::Auth]))
        .build();
    assert!(result.is_err());
}

#[test]
fn builder_applies_policy() {
    let policy = fast_policy().with_retryable_kinds([ErrorKind::Network]);
    let adapter = ResilientAdapter::builder(ScriptedTransport::new())
        .with_policy(policy.clone())
        .build()
        .unwrap();
    assert_eq!(adapter.policy(), &policy);
}
