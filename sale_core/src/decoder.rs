//! Receipt log decoding for the tracked collection and its settlement currencies.
//!
//! Only the standard `Transfer(address,address,uint256)` event is understood. ERC-721
//! transfers index the token id as the fourth topic; ERC-20 transfers carry the amount in
//! the data payload. Logs that do not fit either shape are skipped, never reported as errors.

use std::sync::OnceLock;

use alloy_primitives::{keccak256, Address, B256, U256};
use tracing::debug;

use crate::currency::CurrencyToken;
use crate::types::LogEntry;

pub const TRANSFER_EVENT_SIGNATURE: &str = "Transfer(address,address,uint256)";

/// `keccak256("Transfer(address,address,uint256)")`
pub fn transfer_event_topic() -> B256 {
    static TOPIC: OnceLock<B256> = OnceLock::new();
    *TOPIC.get_or_init(|| keccak256(TRANSFER_EVENT_SIGNATURE.as_bytes()))
}

/// A decoded transfer of a collection token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftTransfer {
    pub from: Address,
    pub to: Address,
    pub token_id: U256,
    pub log_index: usize,
}

/// A decoded ERC-20 transfer of a known settlement currency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyTransfer {
    pub currency: CurrencyToken,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub log_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedTransferLogs {
    /// Every collection transfer in the receipt, in log order
    pub nft_transfers: Vec<NftTransfer>,
    pub currency_transfers: Vec<CurrencyTransfer>,
}

impl DecodedTransferLogs {
    /// The first collection transfer for `token_id`, if the receipt has one
    pub fn nft_transfer_for(&self, token_id: U256) -> Option<&NftTransfer> {
        self.hops_for(token_id).next()
    }

    /// Every collection transfer of `token_id`, in log order. A purchase routed through an
    /// aggregator moves the token more than once (seller to router, router to buyer).
    pub fn hops_for(&self, token_id: U256) -> impl Iterator<Item = &NftTransfer> {
        self.nft_transfers
            .iter()
            .filter(move |t| t.token_id == token_id)
    }

    /// The hop with exactly this sender and receiver, else the first hop of the token
    pub fn nft_transfer_matching(
        &self,
        token_id: U256,
        from: Address,
        to: Address,
    ) -> Option<&NftTransfer> {
        self.hops_for(token_id)
            .find(|t| t.from == from && t.to == to)
            .or_else(|| self.nft_transfer_for(token_id))
    }

    /// Where `token_id` started and where it ended up across all of its hops
    pub fn endpoints_for(&self, token_id: U256) -> Option<(Address, Address)> {
        let mut hops = self.hops_for(token_id);
        let first = hops.next()?;
        let last = hops.last().unwrap_or(first);
        Some((first.from, last.to))
    }

    /// Sum of all decoded transfers of `currency`
    pub fn currency_total(&self, currency: &CurrencyToken) -> U256 {
        self.currency_transfers
            .iter()
            .filter(|t| &t.currency == currency)
            .fold(U256::ZERO, |acc, t| acc.saturating_add(t.amount))
    }

    /// Number of distinct collection tokens moved in the transaction
    pub fn bundle_size(&self) -> usize {
        let mut ids: Vec<U256> = self.nft_transfers.iter().map(|t| t.token_id).collect();
        ids.sort();
        ids.dedup();
        ids.len()
    }
}

/// Split receipt logs into collection transfers and currency transfers.
///
/// Addresses compare byte-wise, so the casing the provider used does not matter.
pub fn decode_transfer_logs(
    logs: &[LogEntry],
    collection: Address,
    currencies: &[CurrencyToken],
) -> DecodedTransferLogs {
    let topic = transfer_event_topic();
    let mut decoded = DecodedTransferLogs::default();

    for (log_index, log) in logs.iter().enumerate() {
        if log.topics.first() != Some(&topic) {
            continue;
        }

        if log.address == collection {
            match decode_nft_transfer(log, log_index) {
                Some(transfer) => decoded.nft_transfers.push(transfer),
                None => debug!("Skipping malformed collection transfer log #{}", log_index),
            }
            continue;
        }

        let Some(currency) = currencies
            .iter()
            .find(|c| c.contract_address == Some(log.address))
        else {
            continue;
        };

        match decode_currency_transfer(log, *currency, log_index) {
            Some(transfer) => decoded.currency_transfers.push(transfer),
            None => debug!(
                "Skipping malformed {} transfer log #{}",
                currency.symbol, log_index
            ),
        }
    }

    decoded
}

fn decode_nft_transfer(log: &LogEntry, log_index: usize) -> Option<NftTransfer> {
    let from = topic_address(log.topics.get(1)?);
    let to = topic_address(log.topics.get(2)?);
    // Some early ERC-721 contracts left the token id unindexed
    let token_id = match log.topics.get(3) {
        Some(topic) => U256::from_be_slice(topic.as_slice()),
        None => word_at(&log.data, 0)?,
    };

    Some(NftTransfer {
        from,
        to,
        token_id,
        log_index,
    })
}

fn decode_currency_transfer(
    log: &LogEntry,
    currency: CurrencyToken,
    log_index: usize,
) -> Option<CurrencyTransfer> {
    if log.topics.len() != 3 {
        return None;
    }
    let from = topic_address(&log.topics[1]);
    let to = topic_address(&log.topics[2]);
    let amount = word_at(&log.data, 0)?;

    Some(CurrencyTransfer {
        currency,
        from,
        to,
        amount,
        log_index,
    })
}

/// Low 20 bytes of a 32-byte topic
fn topic_address(topic: &B256) -> Address {
    Address::from_slice(&topic.as_slice()[12..])
}

fn word_at(data: &[u8], index: usize) -> Option<U256> {
    let start = index * 32;
    let word = data.get(start..start + 32)?;
    Some(U256::from_be_slice(word))
}

#[cfg(test)]
pub(crate) mod test_logs {
    use super::*;
    use alloy_primitives::Bytes;

    pub fn address_topic(address: Address) -> B256 {
        B256::left_padding_from(address.as_slice())
    }

    pub fn word(value: U256) -> B256 {
        B256::from(value.to_be_bytes::<32>())
    }

    pub fn nft_log(collection: Address, from: Address, to: Address, token_id: u64) -> LogEntry {
        LogEntry {
            address: collection,
            topics: vec![
                transfer_event_topic(),
                address_topic(from),
                address_topic(to),
                word(U256::from(token_id)),
            ],
            data: Bytes::new(),
        }
    }

    pub fn erc20_log(token: Address, from: Address, to: Address, amount: U256) -> LogEntry {
        LogEntry {
            address: token,
            topics: vec![transfer_event_topic(), address_topic(from), address_topic(to)],
            data: Bytes::from(amount.to_be_bytes::<32>().to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_logs::*;
    use super::*;
    use crate::currency::{WETH, WILD};
    use alloy_primitives::{address, Bytes};

    const LAND: Address = address!("d396ca541F501F5D303166C509e2045848df356b");
    const SELLER: Address = address!("1111111111111111111111111111111111111111");
    const BUYER: Address = address!("2222222222222222222222222222222222222222");

    fn weth() -> Address {
        WETH.contract_address.unwrap()
    }

    #[test]
    fn test_topic_matches_known_constant() {
        let expected: B256 = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
            .parse()
            .unwrap();
        assert_eq!(transfer_event_topic(), expected);
    }

    #[test]
    fn test_decodes_nft_and_currency_legs() {
        let amount = U256::from(1_500_000_000_000_000_000u128);
        let logs = vec![
            erc20_log(weth(), BUYER, SELLER, amount),
            nft_log(LAND, SELLER, BUYER, 7),
        ];

        let decoded = decode_transfer_logs(&logs, LAND, &[WETH, WILD]);

        assert_eq!(decoded.nft_transfers.len(), 1);
        let nft = decoded.nft_transfer_for(U256::from(7u64)).unwrap();
        assert_eq!(nft.from, SELLER);
        assert_eq!(nft.to, BUYER);
        assert_eq!(nft.log_index, 1);

        assert_eq!(decoded.currency_transfers.len(), 1);
        assert_eq!(decoded.currency_total(&WETH), amount);
        assert_eq!(decoded.currency_total(&WILD), U256::ZERO);
    }

    #[test]
    fn test_unknown_contracts_and_events_are_ignored() {
        let stranger = address!("3333333333333333333333333333333333333333");
        let mut approval = nft_log(LAND, SELLER, BUYER, 7);
        approval.topics[0] = keccak256("Approval(address,address,uint256)".as_bytes());

        let logs = vec![
            erc20_log(stranger, BUYER, SELLER, U256::from(5u64)),
            approval,
        ];

        let decoded = decode_transfer_logs(&logs, LAND, &[WETH]);
        assert!(decoded.nft_transfers.is_empty());
        assert!(decoded.currency_transfers.is_empty());
    }

    #[test]
    fn test_malformed_logs_are_skipped() {
        let mut short_data = erc20_log(weth(), BUYER, SELLER, U256::from(1u64));
        short_data.data = Bytes::from(vec![0u8; 4]);
        let mut missing_topic = nft_log(LAND, SELLER, BUYER, 9);
        missing_topic.topics.truncate(2);

        let decoded = decode_transfer_logs(&[short_data, missing_topic], LAND, &[WETH]);
        assert!(decoded.nft_transfers.is_empty());
        assert!(decoded.currency_transfers.is_empty());
    }

    #[test]
    fn test_unindexed_token_id_is_read_from_data() {
        let log = LogEntry {
            address: LAND,
            topics: vec![
                transfer_event_topic(),
                address_topic(SELLER),
                address_topic(BUYER),
            ],
            data: Bytes::from(U256::from(42u64).to_be_bytes::<32>().to_vec()),
        };
        let decoded = decode_transfer_logs(&[log], LAND, &[]);
        assert_eq!(decoded.nft_transfers[0].token_id, U256::from(42u64));
    }

    #[test]
    fn test_routed_hops_keep_both_legs() {
        let router = address!("C2c862322E9c97D6244a3506655DA95F05246Fd8");
        let logs = vec![
            nft_log(LAND, SELLER, router, 7),
            nft_log(LAND, router, BUYER, 7),
        ];
        let decoded = decode_transfer_logs(&logs, LAND, &[]);
        let token = U256::from(7u64);

        assert_eq!(decoded.hops_for(token).count(), 2);
        assert_eq!(decoded.bundle_size(), 1);
        assert_eq!(decoded.endpoints_for(token), Some((SELLER, BUYER)));
        assert_eq!(
            decoded.nft_transfer_matching(token, router, BUYER).unwrap().log_index,
            1
        );
        // unknown pair falls back to the first hop
        assert_eq!(
            decoded.nft_transfer_matching(token, BUYER, SELLER).unwrap().log_index,
            0
        );
    }

    #[test]
    fn test_bundle_size_counts_distinct_tokens() {
        let logs = vec![
            nft_log(LAND, SELLER, BUYER, 10),
            nft_log(LAND, SELLER, BUYER, 11),
        ];
        let decoded = decode_transfer_logs(&logs, LAND, &[]);
        assert_eq!(decoded.bundle_size(), 2);
        assert!(decoded.nft_transfer_for(U256::from(12u64)).is_none());
    }
}
