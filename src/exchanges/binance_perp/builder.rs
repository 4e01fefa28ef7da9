use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{HmacSigner, ReqwestRest, RestClientBuilder, RestClientConfig};
use crate::exchanges::binance_perp::transport::{BinancePerpTransport, EXCHANGE_NAME};
use std::sync::Arc;

const MAINNET_URL: &str = "https://fapi.binance.com";
const TESTNET_URL: &str = "https://testnet.binancefuture.com";
const RECV_WINDOW_MS: u64 = 5000;

/// Build a Binance Perpetual transport from configuration.
///
/// Account endpoints are signed, so credentials are required.
pub fn build_transport(
    config: &ExchangeConfig,
) -> Result<BinancePerpTransport<ReqwestRest>, ExchangeError> {
    if !config.has_credentials() {
        return Err(ExchangeError::AuthenticationRequired);
    }

    let base_url = if config.testnet {
        TESTNET_URL.to_string()
    } else {
        config
            .base_url
            .clone()
            .unwrap_or_else(|| MAINNET_URL.to_string())
    };

    let rest_config = RestClientConfig::new(base_url, EXCHANGE_NAME.to_string())
        .with_timeout(config.timeout_seconds);
    let signer = Arc::new(
        HmacSigner::new(config.api_key().to_string(), config.secret_key().to_string())
            .with_recv_window(RECV_WINDOW_MS),
    );
    let rest = RestClientBuilder::new(rest_config)
        .with_signer(signer)
        .build()?;

    Ok(BinancePerpTransport::new(rest, config.symbols.clone()))
}
