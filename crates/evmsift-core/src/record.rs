//! Flat record output — the interface produced for the loading pipeline.

use crate::source::{RawBlock, RawTransaction};
use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;

/// Provenance shared by every record produced from one transaction.
#[derive(Debug, Clone)]
pub struct TxContext {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: String,
    pub transaction_index: u64,
    pub to: Option<String>,
    pub status: u64,
}

impl TxContext {
    pub fn new(block: &RawBlock, tx: &RawTransaction) -> Self {
        Self {
            block_number: block.block_number,
            block_timestamp: block.block_timestamp,
            transaction_hash: tx.transaction_hash.clone(),
            transaction_index: tx.transaction_index,
            to: tx.to.clone(),
            status: tx.status,
        }
    }
}

/// One decoded call or event, ready for loading: a destination table name
/// plus an ordered field map (declared parameters first, provenance after).
#[derive(Debug, Clone, Serialize)]
pub struct DecodedRecord {
    pub table: String,
    pub fields: IndexMap<String, Value>,
}

impl DecodedRecord {
    pub fn new(table: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        Self {
            table: table.into(),
            fields,
        }
    }

    /// Append block/transaction provenance, and the log index for events.
    pub fn inject_context(&mut self, cx: &TxContext, log_index: Option<u64>) {
        self.fields
            .insert("block_number".into(), Value::Uint(cx.block_number));
        self.fields
            .insert("block_timestamp".into(), Value::Uint(cx.block_timestamp));
        self.fields.insert(
            "transaction_hash".into(),
            Value::Str(cx.transaction_hash.clone()),
        );
        self.fields.insert(
            "transaction_index".into(),
            Value::Uint(cx.transaction_index),
        );
        if let Some(to) = &cx.to {
            self.fields
                .insert("tx_address".into(), Value::Address(to.clone()));
        }
        self.fields.insert("tx_status".into(), Value::Uint(cx.status));
        if let Some(idx) = log_index {
            self.fields.insert("log_index".into(), Value::Uint(idx));
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_injection_appends_after_params() {
        let mut fields = IndexMap::new();
        fields.insert("_to".to_string(), Value::Address("0xabc".into()));
        let mut record = DecodedRecord::new("erc20_call_transfer", fields);
        let cx = TxContext {
            block_number: 100,
            block_timestamp: 1_700_000_000,
            transaction_hash: "0x4fcc".into(),
            transaction_index: 4,
            to: Some("0xabc".into()),
            status: 1,
        };
        record.inject_context(&cx, Some(3));
        let keys: Vec<_> = record.fields.keys().cloned().collect();
        assert_eq!(keys[0], "_to");
        assert!(keys.contains(&"block_number".to_string()));
        assert!(keys.contains(&"log_index".to_string()));
        assert_eq!(record.field("tx_status"), Some(&Value::Uint(1)));
    }
}
