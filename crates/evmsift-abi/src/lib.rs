//! # evmsift-abi
//!
//! Everything evmsift knows about contract interfaces: the ABI entry model
//! and its JSON file format, the type grammar, selector derivation, the
//! human-readable signature parser, the per-contract ABI store, and the
//! remote signature-database client.

pub mod entry;
pub mod grammar;
pub mod lookup;
pub mod selector;
pub mod signature;
pub mod store;

pub use entry::{AbiEntry, AbiKind, AbiParam, DiscoveryMeta};
pub use grammar::SolType;
pub use lookup::{HttpSignatureSource, LookupError, SigCandidate, SignatureKind, SignatureSource};
pub use selector::{entry_selector, keccak256, Selector};
pub use signature::parse_signature;
pub use store::{AbiStore, ContractAbi, ContractMeta, UnknownSelector};
