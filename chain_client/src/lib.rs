pub mod client;
pub mod ens;
pub mod error;
pub mod types;

pub use client::AlchemyClient;
pub use error::{ChainClientError, Result};
pub use types::*;
