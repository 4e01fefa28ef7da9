//! Transport kernel shared by exchange transports.
//!
//! - `RestClient` / `ReqwestRest`: HTTP client that turns non-2xx responses
//!   into typed [`ExchangeError`](crate::core::errors::ExchangeError) variants
//!   (rate limit, auth, not found, API error) ready for classification.
//! - `Signer` / `HmacSigner`: pluggable request authentication.
//!
//! ```rust,no_run
//! use lotusx_guard::core::kernel::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rest_config = RestClientConfig::new(
//!     "https://fapi.binance.com".to_string(),
//!     "binance_perp".to_string(),
//! );
//! let signer = Arc::new(HmacSigner::new("api_key".to_string(), "secret".to_string()));
//! let rest = RestClientBuilder::new(rest_config).with_signer(signer).build()?;
//!
//! let balances: serde_json::Value = rest.get_json("/fapi/v2/balance", &[], true).await?;
//! # Ok(())
//! # }
//! ```
pub mod rest;
pub mod signer;

pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{HmacSigner, SignatureResult, Signer};
