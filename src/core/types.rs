use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypesError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(#[from] rust_decimal::Error),
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

const QUOTE_ASSETS: [&str; 5] = ["USDT", "USDC", "BUSD", "BTC", "USD"];

/// Type-safe symbol representation with validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub base: String,
    pub quote: String,
}

impl Symbol {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Result<Self, TypesError> {
        let base = base.into();
        let quote = quote.into();

        if base.is_empty() || quote.is_empty() {
            return Err(TypesError::InvalidSymbol(
                "Base and quote assets cannot be empty".to_string(),
            ));
        }

        Ok(Self { base, quote })
    }

    /// Parse an exchange ticker like "BTCUSDT" by matching a known quote suffix
    pub fn from_string(symbol: &str) -> Result<Self, TypesError> {
        QUOTE_ASSETS
            .iter()
            .find_map(|quote| {
                symbol
                    .strip_suffix(quote)
                    .filter(|base| !base.is_empty())
                    .map(|base| (base, *quote))
            })
            .map_or_else(
                || Err(TypesError::InvalidSymbol(symbol.to_string())),
                |(base, quote)| Self::new(base, quote),
            )
    }

    /// The exchange-native ticker (base + quote)
    pub fn ticker(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Type-safe price representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Price {
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-safe quantity representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(#[serde(with = "rust_decimal::serde::str")] pub Decimal);

impl Quantity {
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lenient conversions for exchange payloads, which send numbers as strings.
pub mod conversion {
    use super::{Decimal, Price, Quantity, Symbol, TypesError};
    use tracing::warn;

    /// Convert string to Symbol, treating unknown tickers as a USD-quoted base
    #[inline]
    pub fn string_to_symbol(s: &str) -> Symbol {
        Symbol::from_string(s).unwrap_or_else(|_| Symbol {
            base: s.to_string(),
            quote: "USD".to_string(),
        })
    }

    pub fn parse_decimal(s: &str) -> Result<Decimal, TypesError> {
        Ok(s.trim().parse::<Decimal>()?)
    }

    /// Parse a decimal field, logging and substituting zero on garbage
    pub fn string_to_decimal(s: &str) -> Decimal {
        parse_decimal(s).unwrap_or_else(|error| {
            warn!(value = s, error = %error, "Unparseable decimal from exchange, using zero");
            Decimal::ZERO
        })
    }

    #[inline]
    pub fn string_to_price(s: &str) -> Price {
        Price::new(string_to_decimal(s))
    }

    #[inline]
    pub fn string_to_quantity(s: &str) -> Quantity {
        Quantity::new(string_to_decimal(s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: Quantity,
    pub locked: Quantity,
}

impl Balance {
    pub fn total(&self) -> Decimal {
        self.free.value() + self.locked.value()
    }
}

/// Balances keyed by asset. Empty is the fallback value.
pub type BalanceMap = HashMap<String, Balance>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub position_side: PositionSide,
    pub entry_price: Price,
    pub position_amount: Quantity,
    pub unrealized_pnl: Decimal,
    pub liquidation_price: Option<Price>,
    pub leverage: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// An account fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: Symbol,
    pub id: i64,
    pub order_id: i64,
    pub side: TradeSide,
    pub price: Price,
    pub quantity: Quantity,
    pub commission: Decimal,
    pub commission_asset: String,
    pub realized_pnl: Decimal,
    pub is_maker: bool,
    /// Milliseconds since epoch
    pub time: i64,
}

/// Closed time window used for trade history queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TypesError> {
        if start > end {
            return Err(TypesError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The window ending now and spanning `lookback`
    pub fn last(lookback: ChronoDuration) -> Self {
        let end = Utc::now();
        Self {
            start: end - lookback,
            end,
        }
    }

    pub fn contains_millis(&self, millis: i64) -> bool {
        millis >= self.start.timestamp_millis() && millis <= self.end.timestamp_millis()
    }

    /// Intersect with `[earliest, latest]`, or `None` when nothing remains.
    pub fn clamp(&self, earliest: DateTime<Utc>, latest: DateTime<Utc>) -> Option<Self> {
        let start = self.start.max(earliest);
        let end = self.end.min(latest);
        (start <= end).then_some(Self { start, end })
    }

    /// Split into consecutive windows no longer than `max_span`.
    pub fn chunks(&self, max_span: ChronoDuration) -> Vec<Self> {
        let mut windows = Vec::new();
        let mut cursor = self.start;
        loop {
            let end = cursor
                .checked_add_signed(max_span)
                .map_or(self.end, |end| end.min(self.end));
            windows.push(Self { start: cursor, end });
            match end.checked_add_signed(ChronoDuration::milliseconds(1)) {
                Some(next) if end < self.end => cursor = next,
                _ => break,
            }
        }
        windows
    }
}

/// Live handle to an authenticated exchange connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub exchange: String,
    pub established_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, exchange: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            exchange: exchange.into(),
            established_at: Utc::now(),
        }
    }
}
