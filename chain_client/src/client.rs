use crate::{
    ens::{self, ENS_REGISTRY},
    error::{ChainClientError, Result},
    types::{
        AlchemyClientConfig, AssetTransfersParams, AssetTransfersResult, JsonRpcRequest,
        JsonRpcResponse, OwnedNftsResponse, RpcBlock, RpcReceipt, RpcTransaction,
    },
};
use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use retry_utils::retry_with_backoff;
use sale_core::{
    address_hex, ChainDataProvider, NameResolver, OwnedToken, SaleError, TransactionInfo,
    TransactionReceipt, TransferPage, TransferQuery,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

/// Owned-NFT pages fetched before giving up on a wallet
const MAX_OWNED_PAGES: usize = 20;

/// Alchemy JSON-RPC and NFT API client
#[derive(Debug)]
pub struct AlchemyClient {
    client: Client,
    config: AlchemyClientConfig,
    rpc_url: String,
    nft_url: String,
    request_id: AtomicU64,
}

impl AlchemyClient {
    pub fn new(config: AlchemyClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() && config.rpc_url.is_none() {
            return Err(ChainClientError::Configuration(
                "Alchemy API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            rpc_url: config.rpc_endpoint(),
            nft_url: config.nft_endpoint(),
            config,
            request_id: AtomicU64::new(1),
        })
    }

    /// One JSON-RPC call with retry; `Ok(None)` when the node returns a null result
    async fn rpc<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        retry_with_backoff(
            || self.rpc_once(method, params.clone()),
            &self.config.retry,
            ChainClientError::retry_class,
        )
        .await
    }

    async fn rpc_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!("Alchemy RPC {}", method);
        let response = self.client.post(&self.rpc_url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Alchemy {} failed - Status: {}, Body: {}", method, status, text);
            return Err(match status.as_u16() {
                401 | 403 => ChainClientError::AuthError,
                429 => ChainClientError::RateLimit,
                code if status.is_server_error() => ChainClientError::ServerError {
                    status: code,
                    message: text,
                },
                _ => ChainClientError::ApiError {
                    message: format!("HTTP {}: {}", status, text),
                },
            });
        }

        let body: JsonRpcResponse<T> = response.json().await?;
        if let Some(err) = body.error {
            return Err(ChainClientError::RpcError {
                code: err.code,
                message: err.message,
            });
        }
        Ok(body.result)
    }

    /// `alchemy_getAssetTransfers` for one page
    pub async fn get_asset_transfers(&self, query: &TransferQuery) -> Result<TransferPage> {
        let params = AssetTransfersParams::from(query);
        let result: AssetTransfersResult = self
            .rpc("alchemy_getAssetTransfers", json!([params]))
            .await?
            .ok_or_else(|| ChainClientError::ApiError {
                message: "alchemy_getAssetTransfers returned no result".to_string(),
            })?;

        let mut transfers = Vec::with_capacity(result.transfers.len());
        for transfer in result.transfers {
            match transfer.into_raw() {
                Ok(raw) => transfers.push(raw),
                Err(e) => debug!("Skipping unparseable transfer: {}", e),
            }
        }

        info!(
            "Fetched {} transfers (next page: {})",
            transfers.len(),
            result.page_key.is_some()
        );
        Ok(TransferPage {
            transfers,
            page_key: result.page_key.filter(|k| !k.is_empty()),
        })
    }

    pub async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .rpc("eth_getTransactionReceipt", json!([hash]))
            .await?;
        Ok(receipt.map(TransactionReceipt::from))
    }

    pub async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionInfo>> {
        let tx: Option<RpcTransaction> = self
            .rpc("eth_getTransactionByHash", json!([hash]))
            .await?;
        tx.map(RpcTransaction::into_info).transpose()
    }

    pub async fn get_block_timestamp(&self, block_number: u64) -> Result<Option<DateTime<Utc>>> {
        let block: Option<RpcBlock> = self
            .rpc(
                "eth_getBlockByNumber",
                json!([format!("{:#x}", block_number), false]),
            )
            .await?;
        match block {
            Some(block) => block.timestamp(),
            None => Ok(None),
        }
    }

    /// `getNFTsForOwner` restricted to `contract`, following page keys
    pub async fn get_owned_tokens(
        &self,
        owner: Address,
        contract: Address,
    ) -> Result<Vec<OwnedToken>> {
        let url = format!("{}/getNFTsForOwner", self.nft_url);
        let mut tokens = Vec::new();
        let mut page_key: Option<String> = None;

        for _ in 0..MAX_OWNED_PAGES {
            let page = retry_with_backoff(
                || self.owned_page(&url, owner, contract, page_key.clone()),
                &self.config.retry,
                ChainClientError::retry_class,
            )
            .await?;

            for nft in page.owned_nfts {
                match nft.into_owned() {
                    Ok(token) => tokens.push(token),
                    Err(e) => debug!("Skipping owned NFT: {}", e),
                }
            }

            page_key = page.page_key.filter(|k| !k.is_empty());
            if page_key.is_none() {
                break;
            }
        }

        info!("Wallet {} holds {} plots", address_hex(&owner), tokens.len());
        Ok(tokens)
    }

    async fn owned_page(
        &self,
        url: &str,
        owner: Address,
        contract: Address,
        page_key: Option<String>,
    ) -> Result<OwnedNftsResponse> {
        let mut query = vec![
            ("owner", address_hex(&owner)),
            ("contractAddresses[]", address_hex(&contract)),
            ("withMetadata", "true".to_string()),
            ("pageSize", "100".to_string()),
        ];
        if let Some(key) = page_key {
            query.push(("pageKey", key));
        }

        let response = self.client.get(url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ChainClientError::AuthError,
                429 => ChainClientError::RateLimit,
                code if status.is_server_error() => ChainClientError::ServerError {
                    status: code,
                    message: text,
                },
                _ => ChainClientError::ApiError {
                    message: format!("HTTP {}: {}", status, text),
                },
            });
        }
        Ok(response.json().await?)
    }

    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let result: Option<Bytes> = self
            .rpc("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        Ok(result.unwrap_or_default())
    }

    async fn resolver_for(&self, node: B256) -> Result<Option<Address>> {
        let data = self
            .eth_call(ENS_REGISTRY, ens::encode_node_call(ens::RESOLVER_SIGNATURE, node))
            .await?;
        Ok(ens::decode_address(&data))
    }

    async fn addr_of(&self, node: B256) -> Result<Option<Address>> {
        let Some(resolver) = self.resolver_for(node).await? else {
            return Ok(None);
        };
        let data = self
            .eth_call(resolver, ens::encode_node_call(ens::ADDR_SIGNATURE, node))
            .await?;
        Ok(ens::decode_address(&data))
    }

    /// Reverse record of `address`, only returned when it resolves back to the same address
    pub async fn lookup_address(&self, address: Address) -> Result<Option<String>> {
        let node = ens::reverse_node(&address);
        let Some(resolver) = self.resolver_for(node).await? else {
            return Ok(None);
        };
        let data = self
            .eth_call(resolver, ens::encode_node_call(ens::NAME_SIGNATURE, node))
            .await?;
        let Some(name) = ens::decode_string(&data) else {
            return Ok(None);
        };

        if self.addr_of(ens::namehash(&name)).await? == Some(address) {
            Ok(Some(name))
        } else {
            debug!("Reverse record {} for {} is not verified", name, address_hex(&address));
            Ok(None)
        }
    }

    pub async fn resolve_name(&self, name: &str) -> Result<Option<Address>> {
        self.addr_of(ens::namehash(name)).await
    }
}

#[async_trait]
impl ChainDataProvider for AlchemyClient {
    async fn get_asset_transfers(&self, query: &TransferQuery) -> sale_core::Result<TransferPage> {
        Ok(AlchemyClient::get_asset_transfers(self, query).await?)
    }

    async fn get_transaction_receipt(
        &self,
        hash: B256,
    ) -> sale_core::Result<Option<TransactionReceipt>> {
        Ok(AlchemyClient::get_transaction_receipt(self, hash).await?)
    }

    async fn get_transaction(&self, hash: B256) -> sale_core::Result<Option<TransactionInfo>> {
        Ok(AlchemyClient::get_transaction(self, hash).await?)
    }

    async fn get_block_timestamp(
        &self,
        block_number: u64,
    ) -> sale_core::Result<Option<DateTime<Utc>>> {
        Ok(AlchemyClient::get_block_timestamp(self, block_number).await?)
    }

    async fn get_owned_tokens(
        &self,
        owner: Address,
        contract: Address,
    ) -> sale_core::Result<Vec<OwnedToken>> {
        Ok(AlchemyClient::get_owned_tokens(self, owner, contract).await?)
    }
}

#[async_trait]
impl NameResolver for AlchemyClient {
    async fn lookup_address(&self, address: Address) -> sale_core::Result<Option<String>> {
        AlchemyClient::lookup_address(self, address)
            .await
            .map_err(SaleError::from)
    }

    async fn resolve_name(&self, name: &str) -> sale_core::Result<Option<Address>> {
        AlchemyClient::resolve_name(self, name)
            .await
            .map_err(SaleError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_fails_fast() {
        let err = AlchemyClient::new(AlchemyClientConfig::new("", "eth-mainnet")).unwrap_err();
        assert!(matches!(err, ChainClientError::Configuration(_)));
    }

    #[test]
    fn test_endpoints_from_network() {
        let client = AlchemyClient::new(AlchemyClientConfig::new("key", "eth-mainnet")).unwrap();
        assert_eq!(client.rpc_url, "https://eth-mainnet.g.alchemy.com/v2/key");
        assert_eq!(client.nft_url, "https://eth-mainnet.g.alchemy.com/nft/v3/key");
    }

    #[test]
    fn test_retry_classes() {
        use retry_utils::RetryableError;
        assert_eq!(ChainClientError::RateLimit.retry_class(), RetryableError::RateLimit);
        assert_eq!(
            ChainClientError::RpcError {
                code: -32005,
                message: "limit".to_string()
            }
            .retry_class(),
            RetryableError::RateLimit
        );
        assert_eq!(ChainClientError::AuthError.retry_class(), RetryableError::Other);
        assert!(matches!(
            SaleError::from(ChainClientError::RateLimit),
            SaleError::RateLimited { .. }
        ));
    }
}
