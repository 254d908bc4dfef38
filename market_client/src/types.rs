use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use sale_core::{parse_token_id, CurrencyToken, Listing, Marketplace, MarketSale, ETH};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{MarketClientError, Result};

fn parse_error(message: String) -> MarketClientError {
    MarketClientError::ParseError { message }
}

fn token_id(value: &str) -> Result<U256> {
    parse_token_id(value).map_err(|e| parse_error(e.to_string()))
}

fn optional_address(value: Option<&str>) -> Option<Address> {
    value.and_then(|v| v.parse::<Address>().ok())
}

fn amount(value: &str) -> Result<U256> {
    U256::from_str_radix(value.trim(), 10)
        .map_err(|e| parse_error(format!("invalid amount '{}': {}", value, e)))
}

/// Unix seconds sent either as a number or a numeric string
fn unix_seconds(value: &Value) -> Option<DateTime<Utc>> {
    let seconds = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp(seconds, 0)
}

// ---------------------------------------------------------------------------
// OpenSea v2
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSeaListingsResponse {
    #[serde(default)]
    pub listings: Vec<OpenSeaListing>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSeaListing {
    pub order_hash: String,
    pub price: OpenSeaPrice,
    pub protocol_data: Option<OpenSeaProtocolData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSeaPrice {
    pub current: OpenSeaCurrentPrice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSeaCurrentPrice {
    /// Either a bare symbol or an object with a `symbol` field
    #[serde(default)]
    pub currency: Value,
    pub decimals: Option<u8>,
    pub value: String,
}

impl OpenSeaCurrentPrice {
    fn currency_symbol(&self) -> String {
        match &self.currency {
            Value::String(symbol) => symbol.clone(),
            Value::Object(map) => map
                .get("symbol")
                .and_then(Value::as_str)
                .unwrap_or(ETH.symbol)
                .to_string(),
            _ => ETH.symbol.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSeaProtocolData {
    pub parameters: OpenSeaOrderParameters,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSeaOrderParameters {
    pub offerer: Option<String>,
    #[serde(default)]
    pub offer: Vec<OpenSeaOfferItem>,
    #[serde(default)]
    pub end_time: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSeaOfferItem {
    pub token: Option<String>,
    pub identifier_or_criteria: String,
}

impl OpenSeaListing {
    pub fn into_listing(self) -> Result<Listing> {
        let parameters = self
            .protocol_data
            .map(|p| p.parameters)
            .ok_or_else(|| {
                parse_error(format!("listing {} has no order parameters", self.order_hash))
            })?;
        let item = parameters
            .offer
            .first()
            .ok_or_else(|| parse_error(format!("listing {} offers nothing", self.order_hash)))?;

        let symbol = self.price.current.currency_symbol();
        let decimals = self
            .price
            .current
            .decimals
            .or_else(|| CurrencyToken::by_symbol(&symbol).map(|c| c.decimals))
            .unwrap_or(18);

        Ok(Listing {
            order_id: self.order_hash,
            token_id: token_id(&item.identifier_or_criteria)?,
            marketplace: Marketplace::OpenSea,
            maker: optional_address(parameters.offerer.as_deref()),
            price_amount: amount(&self.price.current.value)?,
            currency_symbol: symbol,
            currency_decimals: decimals,
            expires_at: unix_seconds(&parameters.end_time),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSeaEventsResponse {
    #[serde(default)]
    pub asset_events: Vec<OpenSeaAssetEvent>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSeaAssetEvent {
    pub event_type: Option<String>,
    pub nft: Option<OpenSeaNft>,
    pub seller: Option<String>,
    pub buyer: Option<String>,
    pub payment: Option<OpenSeaPayment>,
    pub transaction: Option<String>,
    #[serde(default)]
    pub event_timestamp: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSeaNft {
    pub identifier: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenSeaPayment {
    pub quantity: String,
    pub token_address: Option<String>,
    pub decimals: Option<u8>,
    pub symbol: Option<String>,
}

impl OpenSeaAssetEvent {
    /// `Ok(None)` for events that are not NFT sales
    pub fn into_sale(self) -> Result<Option<MarketSale>> {
        if self.event_type.as_deref().is_some_and(|t| t != "sale") {
            return Ok(None);
        }
        let Some(nft) = self.nft else {
            return Ok(None);
        };
        let timestamp = unix_seconds(&self.event_timestamp)
            .ok_or_else(|| parse_error(format!("sale of {} has no timestamp", nft.identifier)))?;

        let (price_amount, currency) = match &self.payment {
            Some(payment) => (amount(&payment.quantity)?, payment_currency(payment)),
            None => (U256::ZERO, ETH),
        };
        let decimals = self
            .payment
            .as_ref()
            .and_then(|p| p.decimals)
            .unwrap_or(currency.decimals);

        Ok(Some(MarketSale {
            token_id: token_id(&nft.identifier)?,
            name: nft.name,
            seller: optional_address(self.seller.as_deref()),
            buyer: optional_address(self.buyer.as_deref()),
            price_amount,
            currency_symbol: currency.symbol.to_string(),
            currency_decimals: decimals,
            timestamp,
            transaction_hash: self.transaction.as_deref().and_then(|t| t.parse::<B256>().ok()),
            marketplace: Marketplace::OpenSea,
        }))
    }
}

/// The native currency is reported with the zero address as its token
fn payment_currency(payment: &OpenSeaPayment) -> CurrencyToken {
    let by_contract = optional_address(payment.token_address.as_deref())
        .filter(|a| *a != Address::ZERO)
        .and_then(|a| CurrencyToken::by_contract(&a));
    by_contract
        .or_else(|| payment.symbol.as_deref().and_then(CurrencyToken::by_symbol))
        .unwrap_or(ETH)
}

// ---------------------------------------------------------------------------
// Reservoir
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReservoirAsksResponse {
    #[serde(default)]
    pub orders: Vec<ReservoirOrder>,
    pub continuation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservoirOrder {
    pub id: String,
    pub status: Option<String>,
    pub maker: Option<String>,
    pub price: Option<ReservoirPrice>,
    pub valid_until: Option<i64>,
    pub criteria: Option<ReservoirCriteria>,
    pub token_set_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservoirPrice {
    pub currency: Option<ReservoirCurrency>,
    pub amount: ReservoirAmount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservoirCurrency {
    pub contract: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservoirAmount {
    pub raw: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservoirCriteria {
    pub data: Option<ReservoirCriteriaData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservoirCriteriaData {
    pub token: Option<ReservoirToken>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservoirToken {
    pub token_id: String,
    pub name: Option<String>,
}

impl ReservoirOrder {
    pub fn is_active(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == "active")
    }

    /// Whether the ask is priced in `currency`
    pub fn is_priced_in(&self, currency: &CurrencyToken) -> bool {
        let contract = self
            .price
            .as_ref()
            .and_then(|p| p.currency.as_ref())
            .and_then(|c| optional_address(c.contract.as_deref()));
        match currency.contract_address {
            Some(expected) => contract == Some(expected),
            None => contract.map_or(true, |c| c == Address::ZERO),
        }
    }

    fn token_id_str(&self) -> Option<&str> {
        self.criteria
            .as_ref()
            .and_then(|c| c.data.as_ref())
            .and_then(|d| d.token.as_ref())
            .map(|t| t.token_id.as_str())
            // token set ids look like "token:<contract>:<id>"
            .or_else(|| self.token_set_id.as_deref().and_then(|s| s.rsplit(':').next()))
    }

    pub fn into_listing(self, marketplace: Marketplace) -> Result<Listing> {
        let id = self
            .token_id_str()
            .ok_or_else(|| parse_error(format!("order {} has no token", self.id)))?;
        let token_id = token_id(id)?;
        let price = self
            .price
            .ok_or_else(|| parse_error(format!("order {} has no price", self.id)))?;
        let currency = price.currency.unwrap_or(ReservoirCurrency {
            contract: None,
            symbol: None,
            decimals: None,
        });
        let known = optional_address(currency.contract.as_deref())
            .and_then(|a| CurrencyToken::by_contract(&a));

        Ok(Listing {
            order_id: self.id,
            token_id,
            marketplace,
            maker: optional_address(self.maker.as_deref()),
            price_amount: amount(&price.amount.raw)?,
            currency_symbol: currency
                .symbol
                .or_else(|| known.map(|c| c.symbol.to_string()))
                .unwrap_or_else(|| ETH.symbol.to_string()),
            currency_decimals: currency
                .decimals
                .or_else(|| known.map(|c| c.decimals))
                .unwrap_or(18),
            expires_at: self.valid_until.and_then(|s| DateTime::from_timestamp(s, 0)),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservoirSalesResponse {
    #[serde(default)]
    pub sales: Vec<ReservoirSale>,
    pub continuation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservoirSale {
    pub token: Option<ReservoirToken>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub tx_hash: Option<String>,
    pub timestamp: Option<i64>,
    pub price: Option<ReservoirPrice>,
}

impl ReservoirSale {
    pub fn into_sale(self, marketplace: Marketplace) -> Result<Option<MarketSale>> {
        let (Some(token), Some(price)) = (self.token, self.price) else {
            return Ok(None);
        };
        let timestamp = self
            .timestamp
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .ok_or_else(|| parse_error(format!("sale of {} has no timestamp", token.token_id)))?;
        let currency = price.currency.as_ref();

        Ok(Some(MarketSale {
            token_id: token_id(&token.token_id)?,
            name: token.name,
            seller: optional_address(self.from.as_deref()),
            buyer: optional_address(self.to.as_deref()),
            price_amount: amount(&price.amount.raw)?,
            currency_symbol: currency
                .and_then(|c| c.symbol.clone())
                .unwrap_or_else(|| ETH.symbol.to_string()),
            currency_decimals: currency.and_then(|c| c.decimals).unwrap_or(18),
            timestamp,
            transaction_hash: self.tx_hash.as_deref().and_then(|t| t.parse::<B256>().ok()),
            marketplace,
        }))
    }
}
