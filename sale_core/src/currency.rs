use alloy_primitives::{address, Address};
use serde::Serialize;

/// A currency sales can settle in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CurrencyToken {
    pub symbol: &'static str,
    /// `None` for the chain's native currency
    pub contract_address: Option<Address>,
    pub decimals: u8,
    /// Worth exactly one unit of native currency (WETH), so it can be summed with native value
    pub native_equivalent: bool,
}

pub const ETH: CurrencyToken = CurrencyToken {
    symbol: "ETH",
    contract_address: None,
    decimals: 18,
    native_equivalent: true,
};

pub const WETH: CurrencyToken = CurrencyToken {
    symbol: "WETH",
    contract_address: Some(address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")),
    decimals: 18,
    native_equivalent: true,
};

pub const WILD: CurrencyToken = CurrencyToken {
    symbol: "WILD",
    contract_address: Some(address!("2a3bFF78B79A009976EeA096a51A948a3dC00e34")),
    decimals: 18,
    native_equivalent: false,
};

impl CurrencyToken {
    pub fn is_native(&self) -> bool {
        self.contract_address.is_none()
    }

    /// Whether amounts in `self` and `other` can be added together
    pub fn same_unit(&self, other: &CurrencyToken) -> bool {
        self == other || (self.native_equivalent && other.native_equivalent)
    }

    /// ERC-20 currencies the decoder watches by default
    pub fn wrapped_defaults() -> Vec<CurrencyToken> {
        vec![WETH, WILD]
    }

    pub fn by_symbol(symbol: &str) -> Option<CurrencyToken> {
        [ETH, WETH, WILD]
            .into_iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn by_contract(contract: &Address) -> Option<CurrencyToken> {
        [WETH, WILD]
            .into_iter()
            .find(|c| c.contract_address.as_ref() == Some(contract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert!(ETH.same_unit(&WETH));
        assert!(!ETH.same_unit(&WILD));
        assert!(WILD.same_unit(&WILD));
        assert!(ETH.is_native());
        assert!(!WETH.is_native());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(CurrencyToken::by_symbol("weth"), Some(WETH));
        let wild: Address = "0x2a3bff78b79a009976eea096a51a948a3dc00e34".parse().unwrap();
        assert_eq!(CurrencyToken::by_contract(&wild), Some(WILD));
        assert_eq!(CurrencyToken::by_symbol("USDC"), None);
    }
}
