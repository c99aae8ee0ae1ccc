//! Error types for the evmsift decode pipeline.

use thiserror::Error;

/// Errors that can occur while decoding a single call or event log.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("data too short: need {needed} bytes, have {available}")]
    ShortData { needed: usize, available: usize },

    #[error("offset {offset} points outside the {len} byte payload")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("length word {len} exceeds the {available} bytes available")]
    LengthOverflow { len: usize, available: usize },

    #[error("dirty padding in {ty} word")]
    DirtyPadding { ty: String },

    #[error("boolean word is not 0 or 1")]
    InvalidBool,

    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("{outstanding} outstanding bytes left after decoding all declared types")]
    TrailingBytes { outstanding: usize },

    #[error("invalid log topic: {reason}")]
    InvalidTopic { reason: String },

    #[error("event {event} expects {declared} indexed parameters but the log carries {topics} topics")]
    TopicCountMismatch {
        event: String,
        declared: usize,
        topics: usize,
    },

    #[error("no combination of indexed parameters decodes event {event} against the log data")]
    IndexRecoveryFailed { event: String },

    #[error(transparent)]
    Abi(#[from] AbiError),
}

/// Errors raised while interpreting ABI metadata: type strings, signature
/// strings, and selector derivation.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("type string '{input}' is not parseable: {reason}")]
    Type { input: String, reason: String },

    #[error("signature '{input}' is malformed: {reason}")]
    Signature { input: String, reason: String },

    #[error("tuple parameter '{name}' carries no component list")]
    MissingComponents { name: String },

    #[error("ABI entry of kind {kind} has no selector")]
    NoSelector { kind: String },
}

/// Errors from the contract ABI store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("'{path}' is not a contract address file name")]
    BadFileName { path: String },

    #[error("invalid contract address '{address}'")]
    BadAddress { address: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
