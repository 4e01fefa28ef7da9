use crate::core::{
    errors::ExchangeError,
    types::{BalanceMap, Position, Session, TimeRange, Trade},
};
use async_trait::async_trait;

/// Remote exchange operations consumed by the resilience layer.
///
/// Implementations talk to the network and report failures as raw
/// [`ExchangeError`]s; retrying, classification and fallback happen above.
#[async_trait]
pub trait ExchangeTransport: Send + Sync {
    /// Exchange name for logging and tracing
    fn name(&self) -> &str;

    /// Establish a new authenticated session
    async fn connect(&self) -> Result<Session, ExchangeError>;

    async fn fetch_balance(&self, session: &Session) -> Result<BalanceMap, ExchangeError>;

    async fn fetch_positions(&self, session: &Session) -> Result<Vec<Position>, ExchangeError>;

    async fn fetch_trades(
        &self,
        session: &Session,
        range: TimeRange,
    ) -> Result<Vec<Trade>, ExchangeError>;

    /// Cheap liveness probe for an existing session
    async fn ping(&self, _session: &Session) -> Result<(), ExchangeError> {
        Ok(())
    }

    /// Release the session on the remote side
    async fn disconnect(&self, _session: &Session) -> Result<(), ExchangeError> {
        Ok(())
    }
}
