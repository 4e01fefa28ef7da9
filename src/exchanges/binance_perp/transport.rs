use crate::core::{
    errors::ExchangeError,
    kernel::RestClient,
    traits::ExchangeTransport,
    types::{BalanceMap, Position, Session, TimeRange, Trade},
};
use crate::exchanges::binance_perp::{
    conversions::{
        convert_binance_perp_balance, convert_binance_perp_position,
        convert_binance_perp_user_trade,
    },
    rest::{BinancePerpRestClient, USER_TRADES_LIMIT},
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures_util::future::try_join_all;
use tracing::{debug, instrument};

pub const EXCHANGE_NAME: &str = "binance_perp";

/// The user trades endpoint rejects windows longer than this
const MAX_TRADE_WINDOW_DAYS: i64 = 7;

/// Fills older than this are no longer served by the user trades endpoint
const MAX_TRADE_HISTORY_DAYS: i64 = 180;

/// Binance USDⓈ-M futures account transport
pub struct BinancePerpTransport<R: RestClient> {
    rest: BinancePerpRestClient<R>,
    symbols: Vec<String>,
}

impl<R: RestClient> BinancePerpTransport<R> {
    pub fn new(rest: R, symbols: Vec<String>) -> Self {
        Self {
            rest: BinancePerpRestClient::new(rest),
            symbols,
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    async fn fetch_symbol_trades(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<Trade>, ExchangeError> {
        let mut trades = Vec::new();
        for window in range.chunks(ChronoDuration::days(MAX_TRADE_WINDOW_DAYS)) {
            let end = window.end.timestamp_millis();
            let mut batch = self
                .rest
                .get_user_trades(symbol, window.start.timestamp_millis(), end)
                .await?;

            // A full page may stop mid-millisecond, so continue by trade id
            loop {
                let full_page = batch.len() >= USER_TRADES_LIMIT;
                let next_id = batch.last().filter(|t| t.time <= end).map(|t| t.id + 1);
                trades.extend(
                    batch
                        .iter()
                        .filter(|t| t.time <= end)
                        .map(convert_binance_perp_user_trade),
                );

                match next_id {
                    Some(from_id) if full_page => {
                        batch = self.rest.get_user_trades_from_id(symbol, from_id).await?;
                    }
                    _ => break,
                }
            }
        }
        Ok(trades)
    }
}

#[async_trait]
impl<R: RestClient> ExchangeTransport for BinancePerpTransport<R> {
    fn name(&self) -> &str {
        EXCHANGE_NAME
    }

    #[instrument(skip(self), fields(exchange = EXCHANGE_NAME))]
    async fn connect(&self) -> Result<Session, ExchangeError> {
        let listen_key = self.rest.create_listen_key().await?;
        Ok(Session::new(listen_key.listen_key, EXCHANGE_NAME))
    }

    #[instrument(skip_all, fields(exchange = EXCHANGE_NAME))]
    async fn fetch_balance(&self, _session: &Session) -> Result<BalanceMap, ExchangeError> {
        let balances = self.rest.get_balance().await?;
        Ok(balances
            .iter()
            .map(convert_binance_perp_balance)
            .filter(|balance| !balance.free.is_zero() || !balance.locked.is_zero())
            .map(|balance| (balance.asset.clone(), balance))
            .collect())
    }

    #[instrument(skip_all, fields(exchange = EXCHANGE_NAME))]
    async fn fetch_positions(&self, _session: &Session) -> Result<Vec<Position>, ExchangeError> {
        let positions = self.rest.get_positions().await?;
        Ok(positions
            .iter()
            .map(convert_binance_perp_position)
            .filter(|position| !position.position_amount.is_zero())
            .collect())
    }

    #[instrument(skip(self, _session), fields(exchange = EXCHANGE_NAME))]
    async fn fetch_trades(
        &self,
        _session: &Session,
        range: TimeRange,
    ) -> Result<Vec<Trade>, ExchangeError> {
        if self.symbols.is_empty() {
            debug!("No symbols configured for trade history");
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let horizon = now - ChronoDuration::days(MAX_TRADE_HISTORY_DAYS);
        let Some(range) = range.clamp(horizon, now) else {
            debug!(start = %range.start, end = %range.end, "Range outside served trade history");
            return Ok(Vec::new());
        };

        let per_symbol = try_join_all(
            self.symbols
                .iter()
                .map(|symbol| self.fetch_symbol_trades(symbol, range)),
        )
        .await?;

        let mut trades: Vec<Trade> = per_symbol
            .into_iter()
            .flatten()
            .filter(|trade| range.contains_millis(trade.time))
            .collect();
        trades.sort_by_key(|trade| (trade.time, trade.id));
        Ok(trades)
    }

    async fn ping(&self, _session: &Session) -> Result<(), ExchangeError> {
        self.rest.keepalive_listen_key().await
    }

    async fn disconnect(&self, _session: &Session) -> Result<(), ExchangeError> {
        self.rest.close_listen_key().await
    }
}
