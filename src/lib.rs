pub mod adapter;
pub mod core;
pub mod exchanges;
pub mod resilience;

pub use adapter::{ResilientAdapter, ResilientAdapterBuilder};
pub use core::{errors::ExchangeError, traits::ExchangeTransport, types::*};
pub use exchanges::binance_perp::BinancePerpTransport;
pub use resilience::{ErrorKind, FallbackReason, OperationResult, RetryPolicy};
