use crate::core::errors::ExchangeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Timeouts, resets, refused connections, 5xx gateways
    Network,
    /// The remote asked us to slow down
    RateLimit,
    /// Credentials rejected; the session is no longer usable
    Auth,
    /// Legitimate absence, not a failure
    NotFound,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [Self; 5] = [
        Self::Network,
        Self::RateLimit,
        Self::Auth,
        Self::NotFound,
        Self::Unknown,
    ];

    /// Whether this failure means the current session must be dropped
    pub const fn is_fatal_for_session(self) -> bool {
        matches!(self, Self::Auth)
    }

    /// `NotFound` is an empty answer, everything else is a failure
    pub const fn is_error(self) -> bool {
        !matches!(self, Self::NotFound)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RateLimit => "rate_limit",
            Self::Auth => "auth",
            Self::NotFound => "not_found",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Binance-family error codes
const CODE_DISCONNECTED: i32 = -1001;
const CODE_BACKEND_TIMEOUT: i32 = -1007;
const CODE_TOO_MANY_REQUESTS: i32 = -1003;
const CODE_TOO_MANY_ORDERS: i32 = -1015;
const CODE_INVALID_SIGNATURE: i32 = -1022;
const CODE_BAD_API_KEY_FORMAT: i32 = -2014;
const CODE_REJECTED_MBX_KEY: i32 = -2015;

/// Map any raw transport failure onto exactly one [`ErrorKind`].
///
/// Typed variants are matched structurally; untyped messages fall through to
/// keyword matching and finally to `Unknown`.
pub fn classify(error: &ExchangeError) -> ErrorKind {
    match error {
        ExchangeError::Timeout(_)
        | ExchangeError::ConnectionReset(_)
        | ExchangeError::NetworkError(_) => ErrorKind::Network,
        ExchangeError::RateLimited { .. } => ErrorKind::RateLimit,
        ExchangeError::AuthError(_) | ExchangeError::AuthenticationRequired => ErrorKind::Auth,
        ExchangeError::NotFound(_) => ErrorKind::NotFound,
        ExchangeError::HttpError(err) => classify_http(err),
        ExchangeError::ApiError { code, message } => classify_code(*code, message),
        ExchangeError::Other(message) => classify_message(message),
        ExchangeError::JsonError(_)
        | ExchangeError::InvalidParameters(_)
        | ExchangeError::ConfigurationError(_)
        | ExchangeError::DeserializationError(_)
        | ExchangeError::SerializationError(_)
        | ExchangeError::ConfigError(_) => ErrorKind::Unknown,
    }
}

fn classify_http(error: &reqwest::Error) -> ErrorKind {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        return ErrorKind::Network;
    }
    error.status().map_or_else(
        || classify_message(&error.to_string()),
        |status| classify_code(i32::from(status.as_u16()), ""),
    )
}

fn classify_code(code: i32, message: &str) -> ErrorKind {
    match code {
        429 | 418 | CODE_TOO_MANY_REQUESTS | CODE_TOO_MANY_ORDERS => ErrorKind::RateLimit,
        401 | 403 | CODE_INVALID_SIGNATURE | CODE_BAD_API_KEY_FORMAT | CODE_REJECTED_MBX_KEY => {
            ErrorKind::Auth
        }
        404 => ErrorKind::NotFound,
        500 | 502..=504 | CODE_DISCONNECTED | CODE_BACKEND_TIMEOUT => ErrorKind::Network,
        _ => classify_message(message),
    }
}

fn classify_message(message: &str) -> ErrorKind {
    const NETWORK: [&str; 5] = [
        "timed out",
        "timeout",
        "connection reset",
        "broken pipe",
        "connection refused",
    ];
    const RATE_LIMIT: [&str; 2] = ["rate limit", "too many requests"];
    const AUTH: [&str; 6] = [
        "unauthorized",
        "forbidden",
        "invalid api-key",
        "invalid api key",
        "permission",
        "signature",
    ];

    let message = message.to_lowercase();
    let matches_any = |needles: &[&str]| needles.iter().any(|n| message.contains(n));

    if matches_any(&RATE_LIMIT) {
        ErrorKind::RateLimit
    } else if matches_any(&AUTH) {
        ErrorKind::Auth
    } else if matches_any(&NETWORK) {
        ErrorKind::Network
    } else if message.contains("not found") {
        ErrorKind::NotFound
    } else {
        ErrorKind::Unknown
    }
}
