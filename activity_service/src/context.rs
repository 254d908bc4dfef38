use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::B256;
use futures::future::join_all;
use retry_utils::pace;
use sale_core::{ChainDataProvider, RawTransfer, SaleError, TransactionContext};
use tracing::{debug, info, warn};

/// One transaction whose context is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRequest {
    pub hash: B256,
    /// Some transfer in this transaction came without a block timestamp
    pub needs_timestamp: bool,
}

/// Distinct transaction hashes in first-seen order.
///
/// A batch sale moves several tokens in one transaction; its context is fetched once.
pub fn unique_hashes<'a>(
    transfers: impl IntoIterator<Item = &'a RawTransfer>,
) -> Vec<ContextRequest> {
    let mut position: HashMap<B256, usize> = HashMap::new();
    let mut requests: Vec<ContextRequest> = Vec::new();

    for transfer in transfers {
        let missing = transfer.block_timestamp.is_none();
        match position.get(&transfer.transaction_hash) {
            Some(&i) => requests[i].needs_timestamp |= missing,
            None => {
                position.insert(transfer.transaction_hash, requests.len());
                requests.push(ContextRequest {
                    hash: transfer.transaction_hash,
                    needs_timestamp: missing,
                });
            }
        }
    }
    requests
}

/// Fetches receipt, transaction and (when needed) block timestamp for each hash.
///
/// The provider retries transient failures itself; an error here is final for the item.
#[derive(Clone)]
pub struct ContextFetcher {
    chain: Arc<dyn ChainDataProvider>,
}

impl ContextFetcher {
    pub fn new(chain: Arc<dyn ChainDataProvider>) -> Self {
        Self { chain }
    }

    /// Context for a single transaction
    pub async fn fetch(&self, request: ContextRequest) -> sale_core::Result<TransactionContext> {
        let hash = request.hash;
        let (receipt, transaction) = futures::try_join!(
            self.chain.get_transaction_receipt(hash),
            self.chain.get_transaction(hash),
        )?;

        let receipt = receipt.ok_or_else(|| SaleError::NotFound(format!("receipt for {}", hash)))?;
        let transaction =
            transaction.ok_or_else(|| SaleError::NotFound(format!("transaction {}", hash)))?;

        let block_number = transaction.block_number;
        let mut context = TransactionContext::from_parts(receipt, transaction);

        if request.needs_timestamp {
            if let Some(number) = block_number {
                let timestamp = self.chain.get_block_timestamp(number).await?;
                context = context.with_block_timestamp(timestamp);
            }
        }

        Ok(context)
    }

    /// All contexts concurrently. Failed transactions are logged and left out of the map.
    pub async fn fetch_all(
        &self,
        requests: &[ContextRequest],
    ) -> HashMap<B256, TransactionContext> {
        let results = join_all(requests.iter().map(|request| async move {
            (request.hash, self.fetch(*request).await)
        }))
        .await;

        let mut contexts = HashMap::with_capacity(results.len());
        for (hash, result) in results {
            match result {
                Ok(context) => {
                    contexts.insert(hash, context);
                }
                Err(e) => warn!("Skipping transaction {}: {}", hash, e),
            }
        }
        debug!("Fetched {}/{} transaction contexts", contexts.len(), requests.len());
        contexts
    }

    /// Like [`fetch_all`](Self::fetch_all) but `batch_size` at a time with a pause between batches
    pub async fn fetch_in_batches(
        &self,
        requests: &[ContextRequest],
        batch_size: usize,
        batch_delay_ms: u64,
    ) -> HashMap<B256, TransactionContext> {
        let batch_size = batch_size.max(1);
        let batches = requests.len().div_ceil(batch_size);
        let mut contexts = HashMap::with_capacity(requests.len());

        for (i, batch) in requests.chunks(batch_size).enumerate() {
            contexts.extend(self.fetch_all(batch).await);
            if i + 1 < batches {
                pace(batch_delay_ms).await;
            }
        }

        info!(
            "Fetched {}/{} transaction contexts in {} batches",
            contexts.len(),
            requests.len(),
            batches
        );
        contexts
    }
}
