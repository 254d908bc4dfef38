pub mod coingecko;
pub mod error;
mod http;
pub mod opensea;
pub mod reservoir;
pub mod types;

pub use coingecko::{CoinGeckoClient, CoinGeckoClientConfig};
pub use error::{MarketClientError, Result};
pub use opensea::{OpenSeaClient, OpenSeaClientConfig};
pub use reservoir::{ReservoirClient, ReservoirClientConfig};
