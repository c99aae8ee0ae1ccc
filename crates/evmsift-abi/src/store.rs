//! The per-contract ABI store.
//!
//! One JSON document per contract address, file named
//! `<checksummed-address>.json`. The store keeps every contract in memory
//! behind a single `RwLock`, indexes function/event entries by selector,
//! records selectors that failed resolution, and persists back to disk with
//! atomic renames so a crash can never leave a half-written file.

use crate::entry::{AbiEntry, AbiKind, DiscoveryMeta};
use crate::selector::{entry_selector, Selector};
use alloy_primitives::Address;
use evmsift_core::error::StoreError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::RwLock;
use tracing::{debug, warn};

fn default_true() -> bool {
    true
}

/// A selector that could not be resolved, with the block where it was
/// first seen. Keyed by selector hex in the contract file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownSelector {
    pub selector: String,
    pub block: u64,
}

/// Contract metadata handed to the normalizer and the known-contracts
/// export.
#[derive(Debug, Clone, Serialize)]
pub struct ContractMeta {
    pub address: String,
    pub name: String,
    #[serde(rename = "type")]
    pub contract_type: Option<String>,
    pub decimals: Option<u32>,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
}

/// One contract's ABI file content. Unrecognized top-level fields are
/// preserved in `extra` so tooling-specific data survives a round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAbi {
    pub name: String,
    #[serde(default = "default_true")]
    pub should_decode: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(default)]
    pub abi: Vec<AbiEntry>,
    #[serde(default)]
    pub unknown_selectors: IndexMap<String, UnknownSelector>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,

    #[serde(skip)]
    address: String,
    #[serde(skip)]
    file_name: String,
    #[serde(skip)]
    selectors: HashMap<Selector, usize>,
}

impl ContractAbi {
    pub fn new(name: impl Into<String>, abi: Vec<AbiEntry>) -> Self {
        let mut contract = Self {
            name: name.into(),
            should_decode: true,
            contract_type: None,
            decimals: None,
            token_name: None,
            token_symbol: None,
            abi,
            unknown_selectors: IndexMap::new(),
            extra: serde_json::Map::new(),
            address: String::new(),
            file_name: String::new(),
            selectors: HashMap::new(),
        };
        contract.rebuild_index();
        contract
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Rebuild the selector → entry index from the entry list. Only
    /// function and event entries take part; a selector collision keeps the
    /// first entry and warns.
    fn rebuild_index(&mut self) {
        self.selectors.clear();
        for (idx, entry) in self.abi.iter().enumerate() {
            if !matches!(entry.kind, AbiKind::Function | AbiKind::Event) {
                continue;
            }
            let selector = match entry_selector(entry) {
                Ok(s) => s,
                Err(err) => {
                    warn!(
                        contract = %self.name,
                        entry = %entry.name,
                        %err,
                        "skipping ABI entry with underivable selector"
                    );
                    continue;
                }
            };
            if let Some(existing) = self.selectors.get(&selector) {
                warn!(
                    contract = %self.name,
                    selector = %selector,
                    first = %self.abi[*existing].name,
                    duplicate = %entry.name,
                    "duplicate selector in contract ABI, keeping first entry"
                );
                continue;
            }
            self.selectors.insert(selector, idx);
        }
    }

    fn entry_for(&self, selector: &Selector) -> Option<&AbiEntry> {
        self.selectors.get(selector).map(|idx| &self.abi[*idx])
    }

    fn meta(&self) -> ContractMeta {
        ContractMeta {
            address: self.address.clone(),
            name: self.name.clone(),
            contract_type: self.contract_type.clone(),
            decimals: self.decimals,
            token_name: self.token_name.clone(),
            token_symbol: self.token_symbol.clone(),
        }
    }
}

/// Checksum a contract address string (any hex casing accepted).
pub fn checksum_address(address: &str) -> Result<String, StoreError> {
    Address::from_str(address)
        .map(|a| a.to_checksum(None))
        .map_err(|_| StoreError::BadAddress {
            address: address.to_string(),
        })
}

/// Address → [`ContractAbi`] with shared-ownership concurrency: wrap in an
/// `Arc` and hand clones of the handle to every block decoder.
pub struct AbiStore {
    dir: Option<PathBuf>,
    contracts: RwLock<HashMap<String, ContractAbi>>,
}

impl AbiStore {
    /// An empty store with no backing directory; `save` is a no-op.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            contracts: RwLock::new(HashMap::new()),
        }
    }

    /// Load every `<address>.json` file from a directory.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        let mut contracts = HashMap::new();
        for dirent in std::fs::read_dir(&dir)? {
            let path = dirent?.path();
            if !path.is_file() || path.extension().map(|e| e != "json").unwrap_or(true) {
                debug!(path = %path.display(), "skipping non-contract file");
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| StoreError::BadFileName {
                    path: path.display().to_string(),
                })?;
            let address = checksum_address(stem)?;
            let content = std::fs::read_to_string(&path)?;
            let mut contract: ContractAbi = serde_json::from_str(&content)?;
            contract.address = address.clone();
            contract.file_name = path
                .file_name()
                .and_then(|s| s.to_str())
                .map(String::from)
                .unwrap_or_else(|| format!("{address}.json"));
            contract.rebuild_index();
            contracts.insert(address, contract);
        }
        Ok(Self {
            dir: Some(dir),
            contracts: RwLock::new(contracts),
        })
    }

    /// Insert or replace a contract. Used by tooling and tests; extraction
    /// runs mutate loaded contracts through `record_discovery`.
    pub fn insert(&self, address: &str, mut contract: ContractAbi) -> Result<(), StoreError> {
        let address = checksum_address(address)?;
        contract.address = address.clone();
        if contract.file_name.is_empty() {
            contract.file_name = format!("{address}.json");
        }
        contract.rebuild_index();
        self.contracts.write().unwrap().insert(address, contract);
        Ok(())
    }

    /// Whether the address belongs to a known, decode-enabled contract.
    pub fn decode_enabled(&self, address: &str) -> bool {
        let Ok(address) = checksum_address(address) else {
            return false;
        };
        self.contracts
            .read()
            .unwrap()
            .get(&address)
            .map(|c| c.should_decode)
            .unwrap_or(false)
    }

    /// Look up the ABI entry a selector routes to.
    pub fn resolve(&self, address: &str, selector: &Selector) -> Option<AbiEntry> {
        let address = checksum_address(address).ok()?;
        self.contracts
            .read()
            .unwrap()
            .get(&address)?
            .entry_for(selector)
            .cloned()
    }

    pub fn meta(&self, address: &str) -> Option<ContractMeta> {
        let address = checksum_address(address).ok()?;
        self.contracts.read().unwrap().get(&address).map(ContractAbi::meta)
    }

    /// Whether this selector already failed resolution for this contract.
    /// Failed selectors are not retried within a store lifetime.
    pub fn is_unresolved(&self, address: &str, selector: &Selector) -> bool {
        let Ok(address) = checksum_address(address) else {
            return false;
        };
        self.contracts
            .read()
            .unwrap()
            .get(&address)
            .map(|c| c.unknown_selectors.contains_key(&selector.to_hex()))
            .unwrap_or(false)
    }

    /// Record the outcome of resolving a previously-unknown selector.
    ///
    /// A resolved entry is appended to the contract ABI with discovery
    /// provenance; re-recording an already-present selector warns and does
    /// nothing, since concurrent block decoders may race here. A failed
    /// resolution lands in the unknown-selector ledger.
    pub fn record_discovery(
        &self,
        address: &str,
        selector: &Selector,
        entry: Option<AbiEntry>,
        block: u64,
    ) {
        let Ok(address) = checksum_address(address) else {
            return;
        };
        let mut contracts = self.contracts.write().unwrap();
        let Some(contract) = contracts.get_mut(&address) else {
            warn!(%address, selector = %selector, "discovery recorded for unknown contract");
            return;
        };
        match entry {
            Some(mut entry) => {
                if contract.selectors.contains_key(selector) {
                    warn!(
                        contract = %contract.name,
                        %address,
                        selector = %selector,
                        "selector already added"
                    );
                    return;
                }
                warn!(
                    contract = %contract.name,
                    %address,
                    selector = %selector,
                    entry = %entry.name,
                    block,
                    "resolved selector through signature lookup"
                );
                entry.discovered = Some(DiscoveryMeta {
                    selector: selector.to_hex(),
                    block,
                });
                contract.abi.push(entry);
                let idx = contract.abi.len() - 1;
                contract.selectors.insert(selector.clone(), idx);
            }
            None => {
                warn!(
                    contract = %contract.name,
                    %address,
                    selector = %selector,
                    block,
                    "could not resolve selector into an ABI entry"
                );
                contract.unknown_selectors.insert(
                    selector.to_hex(),
                    UnknownSelector {
                        selector: selector.to_hex(),
                        block,
                    },
                );
            }
        }
    }

    /// Overwrite an event entry's `indexed` flags with a combination found
    /// by indexed-field recovery. The original flags are lost.
    pub fn apply_indexed_flags(&self, address: &str, selector: &Selector, flags: &[bool]) {
        let Ok(address) = checksum_address(address) else {
            return;
        };
        let mut contracts = self.contracts.write().unwrap();
        let Some(contract) = contracts.get_mut(&address) else {
            return;
        };
        let Some(idx) = contract.selectors.get(selector).copied() else {
            return;
        };
        let entry = &mut contract.abi[idx];
        for (param, flag) in entry.inputs.iter_mut().zip(flags) {
            param.indexed = Some(*flag);
        }
        debug!(
            contract = %contract.name,
            selector = %selector,
            ?flags,
            "stored recovered indexed flags"
        );
    }

    /// Metadata for every known contract, decode-enabled or not.
    pub fn contracts(&self) -> Vec<ContractMeta> {
        let mut all: Vec<ContractMeta> = self
            .contracts
            .read()
            .unwrap()
            .values()
            .map(ContractAbi::meta)
            .collect();
        all.sort_by(|a, b| a.address.cmp(&b.address));
        all
    }

    /// Persist every contract back to its file. Writes go to a temp file
    /// first and move into place with an atomic rename; concurrent writers
    /// are last-writer-wins per contract file.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir)?;
        let contracts = self.contracts.read().unwrap();
        for contract in contracts.values() {
            let path = dir.join(&contract.file_name);
            let tmp = dir.join(format!("{}.tmp", contract.file_name));
            let body = serde_json::to_vec_pretty(contract)?;
            std::fs::write(&tmp, body)?;
            std::fs::rename(&tmp, &path)?;
        }
        Ok(())
    }
}
