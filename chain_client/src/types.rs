use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use retry_utils::RetryConfig;
use sale_core::{
    address_hex, parse_token_id, LogEntry, OwnedToken, RawTransfer, TransactionInfo,
    TransactionReceipt, TransferOrder, TransferQuery,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ChainClientError, Result};

/// Configuration for the Alchemy client
#[derive(Debug, Clone)]
pub struct AlchemyClientConfig {
    pub api_key: String,
    /// Network slug, e.g. "eth-mainnet"
    pub network: String,
    pub timeout_seconds: u64,
    pub retry: RetryConfig,
    /// Overrides the JSON-RPC endpoint derived from `network` and `api_key`
    pub rpc_url: Option<String>,
    /// Overrides the NFT API endpoint derived from `network` and `api_key`
    pub nft_url: Option<String>,
}

impl AlchemyClientConfig {
    pub fn new(api_key: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            network: network.into(),
            timeout_seconds: 30,
            retry: RetryConfig::default(),
            rpc_url: None,
            nft_url: None,
        }
    }

    pub fn rpc_endpoint(&self) -> String {
        self.rpc_url.clone().unwrap_or_else(|| {
            format!("https://{}.g.alchemy.com/v2/{}", self.network, self.api_key)
        })
    }

    pub fn nft_endpoint(&self) -> String {
        self.nft_url.clone().unwrap_or_else(|| {
            format!("https://{}.g.alchemy.com/nft/v3/{}", self.network, self.api_key)
        })
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorBody {
    pub code: i64,
    pub message: String,
}

/// Parameters of `alchemy_getAssetTransfers`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransfersParams {
    pub from_block: String,
    pub to_block: String,
    pub contract_addresses: Vec<String>,
    pub category: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
    pub with_metadata: bool,
    pub exclude_zero_value: bool,
    /// Hex quantity, e.g. "0x32"
    pub max_count: String,
    pub order: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_key: Option<String>,
}

impl From<&TransferQuery> for AssetTransfersParams {
    fn from(query: &TransferQuery) -> Self {
        Self {
            from_block: "0x0".to_string(),
            to_block: "latest".to_string(),
            contract_addresses: vec![address_hex(&query.contract_address)],
            category: vec!["erc721".to_string()],
            from_address: query.from_address.as_ref().map(address_hex),
            to_address: query.to_address.as_ref().map(address_hex),
            with_metadata: true,
            exclude_zero_value: false,
            max_count: format!("{:#x}", query.max_count.max(1)),
            order: match query.order {
                TransferOrder::Desc => "desc".to_string(),
                TransferOrder::Asc => "asc".to_string(),
            },
            page_key: query.page_key.clone().filter(|k| !k.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransfersResult {
    #[serde(default)]
    pub transfers: Vec<AlchemyTransfer>,
    pub page_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlchemyTransfer {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub block_num: String,
    pub token_id: Option<String>,
    pub erc721_token_id: Option<String>,
    pub metadata: Option<TransferMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferMetadata {
    pub block_timestamp: Option<DateTime<Utc>>,
}

impl AlchemyTransfer {
    pub fn into_raw(self) -> Result<RawTransfer> {
        let token_id = self
            .erc721_token_id
            .as_deref()
            .or(self.token_id.as_deref())
            .ok_or_else(|| ChainClientError::ParseError {
                message: format!("transfer {} has no token id", self.hash),
            })?;

        Ok(RawTransfer {
            transaction_hash: parse_b256(&self.hash)?,
            token_id: parse_token_id(token_id).map_err(parse_error)?,
            from_address: parse_address(&self.from)?,
            to_address: match self.to.as_deref() {
                Some(to) => parse_address(to)?,
                None => Address::ZERO,
            },
            block_timestamp: self.metadata.and_then(|m| m.block_timestamp),
            block_number: parse_quantity(&self.block_num)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcLog {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: B256,
    pub to: Option<Address>,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

impl From<RpcReceipt> for TransactionReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            to: receipt.to,
            logs: receipt
                .logs
                .into_iter()
                .map(|log| LogEntry {
                    address: log.address,
                    topics: log.topics,
                    data: log.data,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: B256,
    pub value: String,
    pub block_number: Option<String>,
}

impl RpcTransaction {
    pub fn into_info(self) -> Result<TransactionInfo> {
        Ok(TransactionInfo {
            transaction_hash: self.hash,
            value: parse_u256_quantity(&self.value)?,
            block_number: self
                .block_number
                .as_deref()
                .map(parse_quantity)
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcBlock {
    pub timestamp: String,
}

impl RpcBlock {
    pub fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let seconds = parse_quantity(&self.timestamp)?;
        Ok(i64::try_from(seconds)
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0)))
    }
}

/// `getNFTsForOwner` response (NFT API v3)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedNftsResponse {
    #[serde(default)]
    pub owned_nfts: Vec<OwnedNft>,
    pub page_key: Option<String>,
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedNft {
    pub token_id: String,
    pub name: Option<String>,
}

impl OwnedNft {
    pub fn into_owned(self) -> Result<OwnedToken> {
        Ok(OwnedToken {
            token_id: parse_token_id(&self.token_id).map_err(parse_error)?,
            name: self.name.filter(|n| !n.is_empty()),
        })
    }
}

fn parse_error(err: sale_core::SaleError) -> ChainClientError {
    ChainClientError::ParseError {
        message: err.to_string(),
    }
}

pub fn parse_address(value: &str) -> Result<Address> {
    sale_core::parse_address(value).map_err(parse_error)
}

pub fn parse_b256(value: &str) -> Result<B256> {
    value.parse::<B256>().map_err(|e| ChainClientError::ParseError {
        message: format!("invalid hash '{}': {}", value, e),
    })
}

/// Hex JSON-RPC quantity ("0x1b4") as u64
pub fn parse_quantity(value: &str) -> Result<u64> {
    let hex = value.strip_prefix("0x").unwrap_or(value);
    if hex.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(hex, 16).map_err(|e| ChainClientError::ParseError {
        message: format!("invalid quantity '{}': {}", value, e),
    })
}

pub fn parse_u256_quantity(value: &str) -> Result<U256> {
    let hex = value.strip_prefix("0x").unwrap_or(value);
    if hex.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(hex, 16).map_err(|e| ChainClientError::ParseError {
        message: format!("invalid quantity '{}': {}", value, e),
    })
}
