//! ENS plumbing over plain `eth_call`: namehash, call encoding and ABI decoding of the
//! registry and resolver return values.

use alloy_primitives::{address, keccak256, Address, Bytes, B256, U256};

/// ENS registry (same address on mainnet and testnets)
pub const ENS_REGISTRY: Address = address!("00000000000C2E074eC69A0dFb2997BA6C7d2e1e");

pub const RESOLVER_SIGNATURE: &str = "resolver(bytes32)";
pub const NAME_SIGNATURE: &str = "name(bytes32)";
pub const ADDR_SIGNATURE: &str = "addr(bytes32)";

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// EIP-137 namehash. Labels are lowercased; full UTS-46 normalisation is not applied.
pub fn namehash(name: &str) -> B256 {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return B256::ZERO;
    }
    name.rsplit('.').fold(B256::ZERO, |node, label| {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(keccak256(label.as_bytes()).as_slice());
        keccak256(buf)
    })
}

/// Node of `<addr>.addr.reverse`
pub fn reverse_node(address: &Address) -> B256 {
    let hex = format!("{:x}", address);
    namehash(&format!("{}.addr.reverse", hex.trim_start_matches("0x")))
}

/// Calldata for a `fn(bytes32)` call
pub fn encode_node_call(signature: &str, node: B256) -> Bytes {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&selector(signature));
    data.extend_from_slice(node.as_slice());
    Bytes::from(data)
}

/// First return word as an address; the zero address means "unset"
pub fn decode_address(data: &[u8]) -> Option<Address> {
    let word = data.get(..32)?;
    let address = Address::from_slice(&word[12..]);
    (address != Address::ZERO).then_some(address)
}

/// ABI-decode a single dynamic `string` return value; empty strings mean "unset"
pub fn decode_string(data: &[u8]) -> Option<String> {
    let offset = word_as_usize(data, 0)?;
    let length = word_as_usize(data, offset)?;
    let start = offset.checked_add(32)?;
    let bytes = data.get(start..start.checked_add(length)?)?;
    let value = String::from_utf8(bytes.to_vec()).ok()?;
    (!value.is_empty()).then_some(value)
}

fn word_as_usize(data: &[u8], at: usize) -> Option<usize> {
    let word = data.get(at..at.checked_add(32)?)?;
    usize::try_from(U256::from_be_slice(word)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abi_string(value: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&U256::from(32u8).to_be_bytes::<32>());
        out.extend_from_slice(&U256::from(value.len()).to_be_bytes::<32>());
        let mut padded = value.as_bytes().to_vec();
        padded.resize(value.len().div_ceil(32) * 32, 0);
        out.extend_from_slice(&padded);
        out
    }

    #[test]
    fn test_namehash_vectors() {
        assert_eq!(namehash(""), B256::ZERO);
        assert_eq!(
            namehash("eth"),
            "0x93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
                .parse::<B256>()
                .unwrap()
        );
        assert_eq!(
            namehash("foo.eth"),
            "0xde9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
                .parse::<B256>()
                .unwrap()
        );
        assert_eq!(namehash("Foo.ETH"), namehash("foo.eth"));
    }

    #[test]
    fn test_selectors() {
        assert_eq!(selector(RESOLVER_SIGNATURE), [0x01, 0x78, 0xb8, 0xbf]);
        assert_eq!(selector(NAME_SIGNATURE), [0x69, 0x1f, 0x34, 0x31]);
        assert_eq!(selector(ADDR_SIGNATURE), [0x3b, 0x3b, 0x57, 0xde]);
        assert_eq!(encode_node_call(NAME_SIGNATURE, B256::ZERO).len(), 36);
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(decode_string(&abi_string("vitalik.eth")).as_deref(), Some("vitalik.eth"));
        assert_eq!(decode_string(&abi_string("")), None);
        assert_eq!(decode_string(&[0u8; 8]), None);
    }

    #[test]
    fn test_decode_address() {
        let who = address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
        let word = B256::left_padding_from(who.as_slice());
        assert_eq!(decode_address(word.as_slice()), Some(who));
        assert_eq!(decode_address(&[0u8; 32]), None);
    }

    #[test]
    fn test_reverse_node_ignores_checksum_case() {
        let a: Address = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".parse().unwrap();
        assert_eq!(
            reverse_node(&a),
            namehash("d8da6bf26964af9d7eed9e03e53415d37aa96045.addr.reverse")
        );
    }
}
