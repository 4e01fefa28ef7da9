use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::exchanges::binance_perp::types::{
    BinancePerpBalance, BinancePerpListenKey, BinancePerpPosition, BinancePerpUserTrade,
};
use serde_json::Value;
use tracing::instrument;

/// Maximum rows the user trades endpoint returns per request
pub const USER_TRADES_LIMIT: usize = 1000;

/// REST API operations for Binance Perpetual account data
#[derive(Clone)]
pub struct BinancePerpRestClient<R: RestClient> {
    rest: R,
}

impl<R: RestClient> BinancePerpRestClient<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// Open a user data stream; the listen key doubles as the session id
    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn create_listen_key(&self) -> Result<BinancePerpListenKey, ExchangeError> {
        self.rest
            .post_json("/fapi/v1/listenKey", &Value::Null, true)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn keepalive_listen_key(&self) -> Result<(), ExchangeError> {
        let _: Value = self.rest.put_json("/fapi/v1/listenKey", &[], true).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn close_listen_key(&self) -> Result<(), ExchangeError> {
        let _: Value = self.rest.delete_json("/fapi/v1/listenKey", &[], true).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_balance(&self) -> Result<Vec<BinancePerpBalance>, ExchangeError> {
        self.rest.get_json("/fapi/v2/balance", &[], true).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_positions(&self) -> Result<Vec<BinancePerpPosition>, ExchangeError> {
        self.rest.get_json("/fapi/v2/positionRisk", &[], true).await
    }

    /// Account fills for `symbol` between `start_time` and `end_time`
    /// (milliseconds, at most seven days apart).
    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_user_trades(
        &self,
        symbol: &str,
        start_time: i64,
        end_time: i64,
    ) -> Result<Vec<BinancePerpUserTrade>, ExchangeError> {
        let start = start_time.to_string();
        let end = end_time.to_string();
        let limit = USER_TRADES_LIMIT.to_string();
        let params = [
            ("symbol", symbol),
            ("startTime", start.as_str()),
            ("endTime", end.as_str()),
            ("limit", limit.as_str()),
        ];
        self.rest.get_json("/fapi/v1/userTrades", &params, true).await
    }

    /// Account fills for `symbol` with id `from_id` and later, oldest first.
    /// The endpoint does not accept a time window together with `fromId`.
    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_user_trades_from_id(
        &self,
        symbol: &str,
        from_id: i64,
    ) -> Result<Vec<BinancePerpUserTrade>, ExchangeError> {
        let from = from_id.to_string();
        let limit = USER_TRADES_LIMIT.to_string();
        let params = [
            ("symbol", symbol),
            ("fromId", from.as_str()),
            ("limit", limit.as_str()),
        ];
        self.rest.get_json("/fapi/v1/userTrades", &params, true).await
    }
}
