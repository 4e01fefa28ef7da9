#![allow(dead_code)]

use async_trait::async_trait;
use lotusx_guard::core::config::ExchangeConfig;
use lotusx_guard::{
    Balance, BalanceMap, ExchangeError, ExchangeTransport, Position, Quantity, Session, TimeRange,
    Trade,
};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Test configuration utilities
pub struct TestConfig;

impl TestConfig {
    /// Check if live API tests should run (requires real credentials)
    pub fn should_run_live_tests() -> bool {
        env::var("RUN_LIVE_TESTS").unwrap_or_default() == "true"
    }

    /// Create safe test exchange config
    pub fn create_safe_config() -> ExchangeConfig {
        ExchangeConfig::new("test_api_key".to_string(), "test_secret_key".to_string()).testnet(true)
    }
}

/// Per-operation call counters
#[derive(Debug, Default)]
pub struct CallCounts {
    pub connect: AtomicUsize,
    pub balance: AtomicUsize,
    pub positions: AtomicUsize,
    pub trades: AtomicUsize,
    pub ping: AtomicUsize,
    pub disconnect: AtomicUsize,
}

impl CallCounts {
    pub fn remote_fetches(&self) -> usize {
        self.balance.load(Ordering::SeqCst)
            + self.positions.load(Ordering::SeqCst)
            + self.trades.load(Ordering::SeqCst)
    }
}

/// In-memory transport that replays scripted failures, then succeeds with
/// fixed data.
#[derive(Default)]
pub struct ScriptedTransport {
    pub calls: CallCounts,
    connect_script: Mutex<VecDeque<ExchangeError>>,
    balance_script: Mutex<VecDeque<ExchangeError>>,
    positions_script: Mutex<VecDeque<ExchangeError>>,
    trades_script: Mutex<VecDeque<ExchangeError>>,
    ping_script: Mutex<VecDeque<ExchangeError>>,
    balances: BalanceMap,
    trades: Vec<Trade>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, asset: &str, free: i64) -> Self {
        self.balances.insert(
            asset.to_string(),
            Balance {
                asset: asset.to_string(),
                free: Quantity::new(Decimal::from(free)),
                locked: Quantity::new(Decimal::ZERO),
            },
        );
        self
    }

    pub fn with_trades(mut self, trades: Vec<Trade>) -> Self {
        self.trades = trades;
        self
    }

    pub fn fail_connect(self, errors: impl IntoIterator<Item = ExchangeError>) -> Self {
        self.connect_script.lock().unwrap().extend(errors);
        self
    }

    pub fn fail_balance(self, errors: impl IntoIterator<Item = ExchangeError>) -> Self {
        self.balance_script.lock().unwrap().extend(errors);
        self
    }

    pub fn fail_positions(self, errors: impl IntoIterator<Item = ExchangeError>) -> Self {
        self.positions_script.lock().unwrap().extend(errors);
        self
    }

    pub fn fail_trades(self, errors: impl IntoIterator<Item = ExchangeError>) -> Self {
        self.trades_script.lock().unwrap().extend(errors);
        self
    }

    pub fn fail_ping(self, errors: impl IntoIterator<Item = ExchangeError>) -> Self {
        self.ping_script.lock().unwrap().extend(errors);
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn next_failure(script: &Mutex<VecDeque<ExchangeError>>) -> Option<ExchangeError> {
        script.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl ExchangeTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn connect(&self) -> Result<Session, ExchangeError> {
        let n = self.calls.connect.fetch_add(1, Ordering::SeqCst) + 1;
        match Self::next_failure(&self.connect_script) {
            Some(error) => Err(error),
            None => Ok(Session::new(format!("session-{n}"), "scripted")),
        }
    }

    async fn fetch_balance(&self, _session: &Session) -> Result<BalanceMap, ExchangeError> {
        self.calls.balance.fetch_add(1, Ordering::SeqCst);
        match Self::next_failure(&self.balance_script) {
            Some(error) => Err(error),
            None => Ok(self.balances.clone()),
        }
    }

    async fn fetch_positions(&self, _session: &Session) -> Result<Vec<Position>, ExchangeError> {
        self.calls.positions.fetch_add(1, Ordering::SeqCst);
        match Self::next_failure(&self.positions_script) {
            Some(error) => Err(error),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_trades(
        &self,
        _session: &Session,
        range: TimeRange,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.calls.trades.fetch_add(1, Ordering::SeqCst);
        match Self::next_failure(&self.trades_script) {
            Some(error) => Err(error),
            None => Ok(self
                .trades
                .iter()
                .filter(|t| range.contains_millis(t.time))
                .cloned()
                .collect()),
        }
    }

    async fn ping(&self, _session: &Session) -> Result<(), ExchangeError> {
        self.calls.ping.fetch_add(1, Ordering::SeqCst);
        match Self::next_failure(&self.ping_script) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn disconnect(&self, _session: &Session) -> Result<(), ExchangeError> {
        self.calls.disconnect.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn network_error() -> ExchangeError {
    ExchangeError::NetworkError("connection reset by peer".to_string())
}

pub fn auth_error() -> ExchangeError {
    ExchangeError::AuthError("Invalid API-key".to_string())
}

pub fn rate_limit_error() -> ExchangeError {
    ExchangeError::RateLimited {
        message: "Too many requests".to_string(),
        retry_after_secs: None,
    }
}
