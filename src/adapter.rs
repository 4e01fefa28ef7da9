use crate::core::{
    config::ConfigError,
    errors::ExchangeError,
    traits::ExchangeTransport,
    types::{BalanceMap, Position, Session, TimeRange, Trade},
};
use crate::resilience::{
    classify, normalize, ConnectionGuard, ErrorKind, FallbackReason, OperationResult,
    RetryExecutor, RetryPolicy,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Stable account-data facade over an unreliable exchange transport.
///
/// Every fetch checks the session, retries through the policy and collapses
/// failures into an empty value plus a log entry. Nothing here returns an
/// error to the caller.
pub struct ResilientAdapter<X: ExchangeTransport> {
    transport: X,
    guard: ConnectionGuard,
    executor: RetryExecutor,
    reconnect_lock: Mutex<()>,
    shutdown: CancellationToken,
}

impl<X: ExchangeTransport> ResilientAdapter<X> {
    /// Create an adapter with `policy`; the session starts absent.
    pub fn new(transport: X, policy: RetryPolicy) -> Self {
        Self::from_parts(transport, policy, CancellationToken::new())
    }

    pub fn builder(transport: X) -> ResilientAdapterBuilder<X> {
        ResilientAdapterBuilder::new(transport)
    }

    fn from_parts(transport: X, policy: RetryPolicy, shutdown: CancellationToken) -> Self {
        Self {
            transport,
            guard: ConnectionGuard::new(),
            executor: RetryExecutor::new(policy),
            reconnect_lock: Mutex::new(()),
            shutdown,
        }
    }

    pub fn transport(&self) -> &X {
        &self.transport
    }

    pub const fn policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }

    pub fn is_connected(&self) -> bool {
        self.guard.ensure_connected()
    }

    /// Stop all pending and future retries issued through the plain methods
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub async fn get_balance(&self) -> BalanceMap {
        self.get_balance_with_cancel(&self.shutdown).await
    }

    #[instrument(skip_all, fields(exchange = %self.transport.name()))]
    pub async fn get_balance_with_cancel(&self, cancel: &CancellationToken) -> BalanceMap {
        const OPERATION: &str = "get_balance";
        let transport = &self.transport;
        let result = self
            .guarded(OPERATION, cancel, |session| async move {
                transport.fetch_balance(&session).await
            })
            .await;
        normalize(OPERATION, result, BalanceMap::new())
    }

    pub async fn get_positions(&self) -> Vec<Position> {
        self.get_positions_with_cancel(&self.shutdown).await
    }

    #[instrument(skip_all, fields(exchange = %self.transport.name()))]
    pub async fn get_positions_with_cancel(&self, cancel: &CancellationToken) -> Vec<Position> {
        const OPERATION: &str = "get_positions";
        let transport = &self.transport;
        let result = self
            .guarded(OPERATION, cancel, |session| async move {
                transport.fetch_positions(&session).await
            })
            .await;
        normalize(OPERATION, result, Vec::new())
    }

    pub async fn get_trades_by_timeframe(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Trade> {
        self.get_trades_by_timeframe_with_cancel(start, end, &self.shutdown)
            .await
    }

    #[instrument(skip(self, cancel), fields(exchange = %self.transport.name()))]
    pub async fn get_trades_by_timeframe_with_cancel(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Vec<Trade> {
        const OPERATION: &str = "get_trades_by_timeframe";
        let result = match TimeRange::new(start, end) {
            Ok(range) => {
                let transport = &self.transport;
                self.guarded(OPERATION, cancel, |session| async move {
                    transport.fetch_trades(&session, range).await
                })
                .await
            }
            Err(_) => OperationResult::EmptyFallback(FallbackReason::InvalidRange),
        };
        normalize(OPERATION, result, Vec::new())
    }

    /// Report liveness, reconnecting first when no session is held.
    ///
    /// This is the only path from an absent session to a live one.
    #[instrument(skip(self), fields(exchange = %self.transport.name()))]
    pub async fn healthcheck(&self) -> bool {
        if let Some(lease) = self.guard.current() {
            let timeout = self.policy().attempt_timeout;
            let ping = tokio::time::timeout(timeout, self.transport.ping(lease.session()))
                .await
                .unwrap_or_else(|_| Err(ExchangeError::Timeout(timeout.as_millis() as u64)));
            return match ping {
                Ok(()) => true,
                Err(e) => {
                    let kind = classify(&e);
                    if kind == ErrorKind::Auth && self.guard.invalidate(&lease) {
                        error!(error = %e, "Credentials rejected during healthcheck, session invalidated");
                    } else {
                        warn!(kind = %kind, error = %e, "Healthcheck ping failed");
                    }
                    false
                }
            };
        }

        let _reconnecting = self.reconnect_lock.lock().await;
        // Another caller may have reconnected while we waited
        if self.guard.ensure_connected() {
            return true;
        }

        let transport = &self.transport;
        match self
            .executor
            .run("connect", &self.shutdown, |_| transport.connect())
            .await
        {
            OperationResult::Success(session) => {
                self.guard.set_live(session);
                true
            }
            OperationResult::EmptyFallback(reason) => {
                warn!(reason = %reason, "Reconnect did not complete");
                false
            }
            OperationResult::Fatal(kind) => {
                warn!(kind = %kind, "Reconnect failed");
                false
            }
        }
    }

    /// Drop the session locally and release it on the remote side.
    #[instrument(skip(self), fields(exchange = %self.transport.name()))]
    pub async fn disconnect(&self) {
        let Some(lease) = self.guard.clear() else {
            return;
        };
        info!(session_id = %lease.session().id, "Session closed");
        if let Err(error) = self.transport.disconnect(lease.session()).await {
            warn!(error = %error, "Remote session release failed");
        }
    }

    async fn guarded<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        op: F,
    ) -> OperationResult<T>
    where
        F: FnMut(Arc<Session>) -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
    {
        let Some(lease) = self.guard.current() else {
            return OperationResult::EmptyFallback(FallbackReason::NotConnected);
        };
        self.executor
            .with_retry(operation, &self.guard, &lease, cancel, op)
            .await
    }
}

/// Builder for [`ResilientAdapter`] that validates the retry policy.
pub struct ResilientAdapterBuilder<X: ExchangeTransport> {
    transport: X,
    policy: RetryPolicy,
    shutdown: Option<CancellationToken>,
}

impl<X: ExchangeTransport> ResilientAdapterBuilder<X> {
    pub fn new(transport: X) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            shutdown: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Tie the adapter's plain methods to an external shutdown token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub fn build(self) -> Result<ResilientAdapter<X>, ConfigError> {
        self.policy.validate()?;
        Ok(ResilientAdapter::from_parts(
            self.transport,
            self.policy,
            self.shutdown.unwrap_or_default(),
        ))
    }
}
