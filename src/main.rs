use chrono::Duration as ChronoDuration;
use lotusx_guard::core::config::ExchangeConfig;
use lotusx_guard::exchanges::binance_perp::build_transport;
use lotusx_guard::{ResilientAdapter, RetryPolicy, TimeRange};
use tracing_subscriber::EnvFilter;

const ENV_PREFIX: &str = "BINANCE_PERP";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Reads BINANCE_PERP_API_KEY, BINANCE_PERP_SECRET_KEY, BINANCE_PERP_SYMBOLS, ...
    let config = load_config()?;
    let policy = RetryPolicy::from_env(ENV_PREFIX)?;

    let transport = build_transport(&config)?;
    let adapter = ResilientAdapter::builder(transport)
        .with_policy(policy)
        .build()?;

    if !adapter.healthcheck().await {
        println!("⚠️ Exchange unreachable, results below are fallback values");
    }

    let balances = adapter.get_balance().await;
    println!("=== Balances ({}) ===", balances.len());
    for balance in balances.values() {
        println!(
            "  {}: free {} locked {}",
            balance.asset, balance.free, balance.locked
        );
    }

    let positions = adapter.get_positions().await;
    println!("=== Positions ({}) ===", positions.len());
    for position in &positions {
        println!(
            "  {} {:?} {} @ {} (uPnL {})",
            position.symbol,
            position.position_side,
            position.position_amount,
            position.entry_price,
            position.unrealized_pnl
        );
    }

    let window = TimeRange::last(ChronoDuration::hours(24));
    let trades = adapter
        .get_trades_by_timeframe(window.start, window.end)
        .await;
    println!("=== Trades, last 24h ({}) ===", trades.len());
    for trade in trades.iter().take(20) {
        println!(
            "  {} {:?} {} @ {} fee {} {}",
            trade.symbol, trade.side, trade.quantity, trade.price, trade.commission, trade.commission_asset
        );
    }

    adapter.disconnect().await;
    Ok(())
}

#[cfg(feature = "env-file")]
fn load_config() -> anyhow::Result<ExchangeConfig> {
    Ok(ExchangeConfig::from_env_auto(ENV_PREFIX)?)
}

#[cfg(not(feature = "env-file"))]
fn load_config() -> anyhow::Result<ExchangeConfig> {
    Ok(ExchangeConfig::from_env(ENV_PREFIX)?)
}
