//! The per-block extraction driver.
//!
//! Walks a block's transactions and logs, routes everything addressed to a
//! known, decode-enabled contract through the decode engine, normalizes
//! the results, and returns flat records tagged with destination table
//! names. The ABI store is shared (`Arc`) so concurrent per-block drivers
//! see and extend the same selector knowledge; it is saved after every
//! block to bound data loss on crash.

use crate::call::decode_call;
use crate::fallback::{fetch_and_decode_call, fetch_and_decode_log};
use crate::log::{decode_log, parse_topics};
use crate::normalizer::prettify;
use evmsift_abi::entry::AbiEntry;
use evmsift_abi::lookup::{LookupError, SignatureSource};
use evmsift_abi::selector::Selector;
use evmsift_abi::store::AbiStore;
use evmsift_core::error::{DecodeError, StoreError};
use evmsift_core::record::{DecodedRecord, TxContext};
use evmsift_core::source::{RawBlock, RawLog, RawTransaction};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("tx {tx_hash} calling {contract}.{entry} has undecodable input: {source}")]
    UndecodableCall {
        tx_hash: String,
        contract: String,
        entry: String,
        #[source]
        source: DecodeError,
    },

    #[error("log {log_index} in tx {tx_hash} from {contract} is undecodable: {source}")]
    UndecodableLog {
        tx_hash: String,
        log_index: u64,
        contract: String,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Decodes blocks into [`DecodedRecord`]s against a shared ABI store.
///
/// Holds no per-block state; clone-cheap via the shared handles, safe to
/// drive from multiple concurrent block tasks.
#[derive(Clone)]
pub struct BlockDecoder {
    store: Arc<AbiStore>,
    lookup: Option<Arc<dyn SignatureSource>>,
    overload_suffix: bool,
}

impl BlockDecoder {
    pub fn new(store: Arc<AbiStore>) -> Self {
        Self {
            store,
            lookup: None,
            overload_suffix: false,
        }
    }

    /// Attach a signature database for unknown-selector resolution.
    /// Without one, unknown selectors are recorded and skipped.
    pub fn with_lookup(mut self, source: Arc<dyn SignatureSource>) -> Self {
        self.lookup = Some(source);
        self
    }

    /// Append a 1-byte xor fold of the selector to table names. Overloaded
    /// selectors share a name; the suffix keeps their tables apart.
    pub fn with_overload_suffix(mut self, enabled: bool) -> Self {
        self.overload_suffix = enabled;
        self
    }

    fn table_name(&self, contract: &str, kind: &str, entry_name: &str, selector: &Selector) -> String {
        let suffix = if self.overload_suffix {
            let fold = selector.as_bytes().iter().fold(0u8, |acc, b| acc ^ b);
            format!("_{fold:x}")
        } else {
            String::new()
        };
        format!("{contract}_{kind}_{entry_name}{suffix}")
    }

    /// Decode one block's calls and logs. The store is persisted before
    /// returning so discovered selectors survive a crash mid-run.
    pub async fn decode_block(
        &self,
        block: &RawBlock,
    ) -> Result<Vec<DecodedRecord>, ExtractError> {
        debug!(block = block.block_number, "decoding block");
        let mut records = Vec::new();
        for tx in &block.transactions {
            let cx = TxContext::new(block, tx);
            self.decode_transaction(block, tx, &cx, &mut records).await?;
            for log in &tx.logs {
                self.decode_log_entry(block, tx, log, &cx, &mut records).await?;
            }
        }
        info!(
            block = block.block_number,
            records = records.len(),
            "block decoded, saving ABI changes"
        );
        self.store.save()?;
        Ok(records)
    }

    async fn decode_transaction(
        &self,
        block: &RawBlock,
        tx: &RawTransaction,
        cx: &TxContext,
        records: &mut Vec<DecodedRecord>,
    ) -> Result<(), ExtractError> {
        let Some(to) = tx.to.as_deref() else {
            return Ok(());
        };
        if !self.store.decode_enabled(to) {
            return Ok(());
        }
        let split = tx.input.len().min(4);
        let selector = Selector::from_bytes(&tx.input[..split]);
        let params = &tx.input[split..];

        let mut resolved = None;
        if let Some(entry) = self.store.resolve(to, &selector) {
            // Fallback entries never enter the selector index, so this is
            // always a function entry.
            match decode_call(&entry, params, false) {
                Ok(args) => resolved = Some((entry, args)),
                Err(err) if tx.status == 1 => {
                    error!(
                        tx = %tx.transaction_hash,
                        contract = to,
                        entry = %entry.name,
                        %err,
                        "successful transaction could not be decoded"
                    );
                    return Err(ExtractError::UndecodableCall {
                        tx_hash: tx.transaction_hash.clone(),
                        contract: to.to_string(),
                        entry: entry.name.clone(),
                        source: err,
                    });
                }
                Err(err) => {
                    warn!(
                        tx = %tx.transaction_hash,
                        contract = to,
                        %err,
                        "reverted transaction did not decode"
                    );
                }
            }
        } else if !self.store.is_unresolved(to, &selector) {
            if tx.status == 0 {
                warn!(
                    tx = %tx.transaction_hash,
                    contract = to,
                    selector = %selector,
                    "reverted transaction has unknown signature and will not be decoded"
                );
            } else if selector.as_bytes().len() < 4 {
                // Plain value transfers and fallback calls have no selector
                // to look up.
                self.store
                    .record_discovery(to, &selector, None, block.block_number);
            } else if let Some(lookup) = &self.lookup {
                match fetch_and_decode_call(lookup.as_ref(), &selector, params).await? {
                    Some((entry, args)) => {
                        self.store.record_discovery(
                            to,
                            &selector,
                            Some(entry.clone()),
                            block.block_number,
                        );
                        resolved = Some((entry, args));
                    }
                    None => {
                        self.store
                            .record_discovery(to, &selector, None, block.block_number);
                    }
                }
            } else {
                self.store
                    .record_discovery(to, &selector, None, block.block_number);
            }
        }

        if let Some((entry, mut fields)) = resolved {
            let Some(meta) = self.store.meta(to) else {
                return Ok(());
            };
            let table = self.table_name(&meta.name, "call", &entry.name, &selector);
            prettify(&meta, &mut fields, &entry, &selector);
            let mut record = DecodedRecord::new(table, fields);
            record.inject_context(cx, None);
            debug!(
                tx = %tx.transaction_hash,
                table = %record.table,
                "decoded call"
            );
            records.push(record);
        }
        Ok(())
    }

    async fn decode_log_entry(
        &self,
        block: &RawBlock,
        tx: &RawTransaction,
        log: &RawLog,
        cx: &TxContext,
        records: &mut Vec<DecodedRecord>,
    ) -> Result<(), ExtractError> {
        if !self.store.decode_enabled(&log.address) {
            return Ok(());
        }
        let Some(topic0) = log.topic0() else {
            return Ok(());
        };
        let undecodable = |source: DecodeError| ExtractError::UndecodableLog {
            tx_hash: tx.transaction_hash.clone(),
            log_index: log.log_index,
            contract: log.address.clone(),
            source,
        };
        let selector = Selector::from_hex(topic0).map_err(|e| {
            undecodable(DecodeError::InvalidTopic {
                reason: format!("bad topic0 '{topic0}': {e}"),
            })
        })?;
        let param_topics = parse_topics(&log.topics[1..]).map_err(&undecodable)?;

        let mut resolved: Option<(AbiEntry, _)> = None;
        if let Some(mut entry) = self.store.resolve(&log.address, &selector) {
            let decoded =
                decode_log(&entry, &param_topics, &log.data).map_err(&undecodable)?;
            if let Some(flags) = &decoded.recovered {
                warn!(
                    contract = %log.address,
                    event = %entry.name,
                    ?flags,
                    "recovered indexed flags differ from the stored ABI, updating it"
                );
                self.store
                    .apply_indexed_flags(&log.address, &selector, flags);
                for (input, flag) in entry.inputs.iter_mut().zip(flags) {
                    input.indexed = Some(*flag);
                }
            }
            resolved = Some((entry, decoded));
        } else if !self.store.is_unresolved(&log.address, &selector) {
            if let Some(lookup) = &self.lookup {
                match fetch_and_decode_log(lookup.as_ref(), &selector, &param_topics, &log.data)
                    .await?
                {
                    Some((entry, decoded)) => {
                        self.store.record_discovery(
                            &log.address,
                            &selector,
                            Some(entry.clone()),
                            block.block_number,
                        );
                        resolved = Some((entry, decoded));
                    }
                    None => {
                        self.store.record_discovery(
                            &log.address,
                            &selector,
                            None,
                            block.block_number,
                        );
                    }
                }
            } else {
                self.store
                    .record_discovery(&log.address, &selector, None, block.block_number);
            }
        }

        if let Some((entry, decoded)) = resolved {
            let Some(meta) = self.store.meta(&log.address) else {
                return Ok(());
            };
            let table = self.table_name(&meta.name, "logs", &decoded.name, &selector);
            let mut fields = decoded.fields;
            prettify(&meta, &mut fields, &entry, &selector);
            let mut record = DecodedRecord::new(table, fields);
            record.inject_context(cx, Some(log.log_index));
            debug!(
                tx = %tx.transaction_hash,
                log_index = log.log_index,
                table = %record.table,
                "decoded log"
            );
            records.push(record);
        }
        Ok(())
    }
}
