use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use std::collections::HashMap;

/// Result type for signing operations: (headers, `query_params`)
pub type SignatureResult = Result<(HashMap<String, String>, Vec<(String, String)>), ExchangeError>;

/// Signer trait for request authentication
///
/// Implementations return the headers to attach and the complete list of query
/// parameters to send, original parameters included.
pub trait Signer: Send + Sync {
    /// Sign a request and return headers and query parameters
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `endpoint` - API endpoint path
    /// * `query_string` - Query string (without leading '?')
    /// * `body` - Raw request body bytes
    /// * `timestamp` - Request timestamp in milliseconds
    fn sign_request(
        &self,
        method: &str,
        endpoint: &str,
        query_string: &str,
        body: &[u8],
        timestamp: u64,
    ) -> SignatureResult;
}

/// HMAC-SHA256 signer using the Binance query-string scheme
pub struct HmacSigner {
    api_key: Secret<String>,
    secret_key: Secret<String>,
    recv_window_ms: Option<u64>,
}

impl HmacSigner {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            recv_window_ms: None,
        }
    }

    /// Ask the exchange to reject requests older than `recv_window_ms`
    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = Some(recv_window_ms);
        self
    }

    fn signature(&self, payload: &str) -> Result<String, ExchangeError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::AuthError(format!("Invalid secret key: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Signer for HmacSigner {
    fn sign_request(
        &self,
        _method: &str,
        _endpoint: &str,
        query_string: &str,
        body: &[u8],
        timestamp: u64,
    ) -> SignatureResult {
        let mut params: Vec<(String, String)> = query_string
            .split('&')
            .filter_map(|param| {
                param
                    .split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
            })
            .collect();

        if let Some(recv_window) = self.recv_window_ms {
            params.push(("recvWindow".to_string(), recv_window.to_string()));
        }
        params.push(("timestamp".to_string(), timestamp.to_string()));

        let mut payload = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        if let Ok(body_str) = std::str::from_utf8(body) {
            if !body_str.is_empty() {
                payload.push_str(body_str);
            }
        }

        let signature = self.signature(&payload)?;
        params.push(("signature".to_string(), signature));

        let mut headers = HashMap::new();
        headers.insert(
            "X-MBX-APIKEY".to_string(),
            self.api_key.expose_secret().clone(),
        );

        Ok((headers, params))
    }
}
