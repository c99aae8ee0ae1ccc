//! Selector derivation.
//!
//! A selector is the keccak256 hash of an entry's canonical signature:
//! the first 4 bytes for functions, the full 32-byte digest for event
//! topics, and the empty string for fallback entries.

use crate::entry::{AbiEntry, AbiKind};
use evmsift_core::error::AbiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tiny_keccak::{Hasher, Keccak};

/// keccak256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// A function selector (4 bytes), event topic (32 bytes), or the empty
/// fallback marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector(Vec<u8>);

impl Selector {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn fallback() -> Self {
        Self(Vec::new())
    }

    /// Derive a 4-byte function selector from a canonical signature string.
    pub fn function(signature: &str) -> Self {
        Self(keccak256(signature.as_bytes())[..4].to_vec())
    }

    /// Derive a 32-byte event topic from a canonical signature string.
    pub fn event(signature: &str) -> Self {
        Self(keccak256(signature.as_bytes()).to_vec())
    }

    /// Parse from a `0x`-prefixed hex string (topics, ledger keys).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        Ok(Self(hex::decode(s)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    /// Event topics are full 32-byte digests.
    pub fn is_event(&self) -> bool {
        self.0.len() == 32
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// The selector an ABI entry answers to.
pub fn entry_selector(entry: &AbiEntry) -> Result<Selector, AbiError> {
    match entry.kind {
        AbiKind::Function => Ok(Selector::function(&entry.signature())),
        AbiKind::Event => Ok(Selector::event(&entry.signature())),
        AbiKind::Fallback => Ok(Selector::fallback()),
        other => Err(AbiError::NoSelector {
            kind: other.as_str().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AbiParam;

    #[test]
    fn erc20_transfer_function_selector() {
        let sel = Selector::function("transfer(address,uint256)");
        assert_eq!(sel.to_hex(), "0xa9059cbb");
    }

    #[test]
    fn erc20_transfer_event_topic() {
        let sel = Selector::event("Transfer(address,address,uint256)");
        assert_eq!(
            sel.to_hex(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert!(sel.is_event());
    }

    #[test]
    fn uniswap_v3_swap_topic() {
        let sel = Selector::event("Swap(address,address,int256,int256,uint160,uint128,int24)");
        assert_eq!(
            sel.to_hex(),
            "0xc42079f94a6350d7e6235f29174924f928cc2ac818eb64fed8004e115fbcca67"
        );
    }

    #[test]
    fn entry_selector_by_kind() {
        let entry = AbiEntry {
            kind: AbiKind::Function,
            name: "approve".into(),
            inputs: vec![
                AbiParam::new("_spender", "address"),
                AbiParam::new("_value", "uint256"),
            ],
            outputs: None,
            anonymous: None,
            state_mutability: None,
            discovered: None,
        };
        assert_eq!(entry_selector(&entry).unwrap().to_hex(), "0x095ea7b3");

        let fallback = AbiEntry {
            kind: AbiKind::Fallback,
            name: String::new(),
            inputs: vec![],
            outputs: None,
            anonymous: None,
            state_mutability: None,
            discovered: None,
        };
        assert!(entry_selector(&fallback).unwrap().as_bytes().is_empty());

        let ctor = AbiEntry {
            kind: AbiKind::Constructor,
            ..fallback
        };
        assert!(entry_selector(&ctor).is_err());
    }

    #[test]
    fn selector_hex_roundtrip() {
        let sel = Selector::from_hex("0xa9059cbb").unwrap();
        assert_eq!(sel.as_bytes(), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(sel.to_hex(), "0xa9059cbb");
    }
}
