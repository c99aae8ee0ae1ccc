//! # evmsift-core
//!
//! Shared primitives for the evmsift decode pipeline: the decoded value
//! model, the `Wei` high-precision decimal, raw block input types, the
//! flat record output type, and the error taxonomy used across all
//! evmsift crates.

pub mod error;
pub mod record;
pub mod source;
pub mod value;
pub mod wei;

pub use error::{AbiError, DecodeError, StoreError};
pub use record::{DecodedRecord, TxContext};
pub use source::{RawBlock, RawLog, RawTransaction};
pub use value::Value;
pub use wei::Wei;
