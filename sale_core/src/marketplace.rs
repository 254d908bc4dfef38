use std::collections::HashMap;
use std::fmt;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::currency::{CurrencyToken, WETH, WILD};

/// Venue a sale settled through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marketplace {
    OpenSea,
    Reservoir,
    #[serde(rename = "WWMM")]
    Wwmm,
    Unknown,
}

impl Marketplace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Marketplace::OpenSea => "OpenSea",
            Marketplace::Reservoir => "Reservoir",
            Marketplace::Wwmm => "WWMM",
            Marketplace::Unknown => "Unknown",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "opensea" | "seaport" => Some(Marketplace::OpenSea),
            "reservoir" => Some(Marketplace::Reservoir),
            "wwmm" | "wilder" => Some(Marketplace::Wwmm),
            _ => None,
        }
    }

    /// Wrapped currency this venue normally settles in
    pub fn settlement_currency(&self) -> Option<CurrencyToken> {
        match self {
            Marketplace::OpenSea | Marketplace::Reservoir => Some(WETH),
            Marketplace::Wwmm => Some(WILD),
            Marketplace::Unknown => None,
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One known settlement contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketplaceContract {
    pub marketplace: Marketplace,
    pub address: Address,
    pub label: &'static str,
}

/// Canonical settlement contract table. New protocol versions are appended here.
///
/// `0xb233…84C9` is listed by Reservoir as its exchange but is also the collection's own
/// marketplace (WWMM v1); it is attributed to WWMM.
const KNOWN_CONTRACTS: &[(Marketplace, Address, &str)] = &[
    (Marketplace::OpenSea, address!("00000000006c3852cbEf3e08E8dF289169EdE581"), "Seaport 1.1"),
    (Marketplace::OpenSea, address!("00000000000006c7676171937C990c3976D7C140"), "Seaport 1.2"),
    (Marketplace::OpenSea, address!("0000000000000aD24e80fd803C6ac37206a45f15"), "Seaport 1.3"),
    (Marketplace::OpenSea, address!("00000000000001ad428e4906aE43D8F9852d0dD6"), "Seaport 1.4"),
    (Marketplace::OpenSea, address!("00000000000000ADc04C56Bf30aC9d3c0aAF14dC"), "Seaport 1.5"),
    (Marketplace::OpenSea, address!("0000000000000068F116a894984e2DB1123eB395"), "Seaport 1.6"),
    (
        Marketplace::Reservoir,
        address!("C2c862322E9c97D6244a3506655DA95F05246Fd8"),
        "Reservoir V6.0.1",
    ),
    (
        Marketplace::Reservoir,
        address!("178A86D36D89c7FDeBeA90b739605da7B131ff6A"),
        "Reservoir Router",
    ),
    (Marketplace::Wwmm, address!("b233e3602BB06AA2c2dB0982BBaf33c2b15184C9"), "WWMM v1"),
    (Marketplace::Wwmm, address!("5ebc127fae83ed5bdd91fc6a5f5767E259dF5642"), "WWMM v2"),
];

/// Address lookup from called contract to marketplace
#[derive(Debug, Clone)]
pub struct MarketplaceRegistry {
    contracts: Vec<MarketplaceContract>,
    index: HashMap<Address, usize>,
}

impl Default for MarketplaceRegistry {
    fn default() -> Self {
        let mut registry = Self {
            contracts: Vec::with_capacity(KNOWN_CONTRACTS.len()),
            index: HashMap::new(),
        };
        for (marketplace, address, label) in KNOWN_CONTRACTS {
            registry.register(*marketplace, *address, label);
        }
        registry
    }
}

impl MarketplaceRegistry {
    pub fn empty() -> Self {
        Self {
            contracts: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a settlement contract. The first registration of an address wins.
    pub fn register(&mut self, marketplace: Marketplace, address: Address, label: &'static str) {
        if self.index.contains_key(&address) {
            return;
        }
        self.index.insert(address, self.contracts.len());
        self.contracts.push(MarketplaceContract {
            marketplace,
            address,
            label,
        });
    }

    pub fn with_contract(
        mut self,
        marketplace: Marketplace,
        address: Address,
        label: &'static str,
    ) -> Self {
        self.register(marketplace, address, label);
        self
    }

    /// Which marketplace the called contract belongs to; `None` for anything unknown
    pub fn classify(&self, called_contract: Option<&Address>) -> Option<Marketplace> {
        self.lookup(called_contract?).map(|c| c.marketplace)
    }

    pub fn lookup(&self, address: &Address) -> Option<&MarketplaceContract> {
        self.index.get(address).map(|&i| &self.contracts[i])
    }

    pub fn contracts_for(
        &self,
        marketplace: Marketplace,
    ) -> impl Iterator<Item = &MarketplaceContract> {
        self.contracts
            .iter()
            .filter(move |c| c.marketplace == marketplace)
    }

    pub fn contracts(&self) -> &[MarketplaceContract] {
        &self.contracts
    }
}
