//! # evmsift-decode
//!
//! The decode engine: raw calldata and event logs in, typed and normalized
//! warehouse records out. The ABI word decoder here is strict about
//! padding and sign extension — the indexed-field recovery search and the
//! speculative signature-guessing fallback both rely on wrong guesses
//! failing loudly.

pub mod call;
pub mod decoder;
pub mod extract;
pub mod fallback;
pub mod log;
pub mod normalizer;

pub use call::{decode_call, param_name};
pub use decoder::decode_parameters;
pub use extract::{BlockDecoder, ExtractError};
pub use fallback::{fetch_and_decode_call, fetch_and_decode_log};
pub use log::{decode_log, parse_topics, DecodedLog};
pub use normalizer::prettify;
