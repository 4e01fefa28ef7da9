pub mod builder; // config → concrete transport
pub mod conversions; // exchange payloads → core types
pub mod rest; // thin typed wrapper around RestClient
pub mod transport; // impl ExchangeTransport
pub mod types; // serde structs ← raw JSON

pub use builder::build_transport;
pub use rest::BinancePerpRestClient;
pub use transport::BinancePerpTransport;
