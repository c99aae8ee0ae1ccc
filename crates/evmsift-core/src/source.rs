//! Raw block input types — the interface consumed from the RPC collaborator.
//!
//! evmsift does not fetch chain data itself. The extraction driver is handed
//! blocks in this shape, with transaction receipts and logs already joined
//! in. Hex payloads (`input`, `data`) are decoded to bytes on the way in;
//! topics stay as hex strings until decode time.

use serde::{Deserialize, Serialize};

/// Serde adapter for `0x`-prefixed hex byte payloads.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// One block with all transactions, receipts merged in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub block_number: u64,
    /// Unix seconds.
    pub block_timestamp: u64,
    pub block_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    pub transactions: Vec<RawTransaction>,
}

/// A transaction joined with the receipt fields the decoder needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub transaction_hash: String,
    pub transaction_index: u64,
    /// Destination address; None for contract creation.
    #[serde(default)]
    pub to: Option<String>,
    /// Calldata: 4-byte selector followed by ABI-encoded parameters.
    #[serde(with = "hex_bytes")]
    pub input: Vec<u8>,
    /// Receipt status: 1 = success, 0 = reverted.
    pub status: u64,
    #[serde(default)]
    pub logs: Vec<RawLog>,
}

/// One event log entry from a transaction receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    /// Contract address that emitted the log.
    pub address: String,
    /// topics[0] is the event signature hash; the rest are indexed params.
    pub topics: Vec<String>,
    /// ABI-encoded non-indexed parameters.
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub log_index: u64,
}

impl RawLog {
    /// topics[0] — the event signature hash, if present.
    pub fn topic0(&self) -> Option<&str> {
        self.topics.first().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "blockNumber": 17084641,
        "blockTimestamp": 1662878449,
        "blockHash": "0xdeadbeef",
        "transactions": [{
            "transactionHash": "0x4fcc884b",
            "transactionIndex": 4,
            "to": "0x32950db2a7164aE833121501C797D79E7B79d74C",
            "input": "0xa9059cbb",
            "status": 1,
            "logs": [{
                "address": "0x32950db2a7164aE833121501C797D79E7B79d74C",
                "topics": ["0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"],
                "data": "0x",
                "logIndex": 3
            }]
        }]
    }"#;

    #[test]
    fn block_deserializes_from_camel_case() {
        let block: RawBlock = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(block.block_number, 17_084_641);
        let tx = &block.transactions[0];
        assert_eq!(tx.input, vec![0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(tx.logs[0].log_index, 3);
        assert!(tx.logs[0].data.is_empty());
        assert!(tx.logs[0].topic0().unwrap().starts_with("0xddf252ad"));
    }

    #[test]
    fn hex_bytes_roundtrip() {
        let block: RawBlock = serde_json::from_str(SAMPLE).unwrap();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["transactions"][0]["input"], "0xa9059cbb");
    }
}
