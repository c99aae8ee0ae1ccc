//! Calldata decoding against a resolved ABI entry.

use crate::decoder::decode_parameters;
use evmsift_abi::entry::{AbiEntry, AbiParam};
use evmsift_abi::grammar::SolType;
use evmsift_core::error::DecodeError;
use evmsift_core::value::Value;
use indexmap::IndexMap;

/// Parameter name, falling back to the positional `param_{i}` convention
/// for ABIs that omit names.
pub fn param_name(param: &AbiParam, index: usize) -> String {
    if param.name.is_empty() {
        format!("param_{index}")
    } else {
        param.name.clone()
    }
}

/// Decode the parameter bytes of a call (selector already stripped) into
/// an ordered name → value map.
///
/// `strict` rejects payloads with bytes left over after all declared
/// inputs — used when guessing signatures, where a candidate that only
/// explains a prefix of the data is a wrong candidate.
pub fn decode_call(
    entry: &AbiEntry,
    params: &[u8],
    strict: bool,
) -> Result<IndexMap<String, Value>, DecodeError> {
    let types = entry
        .inputs
        .iter()
        .map(SolType::resolve)
        .collect::<Result<Vec<_>, _>>()?;
    let values = decode_parameters(&types, params, strict)?;
    Ok(entry
        .inputs
        .iter()
        .enumerate()
        .map(|(i, p)| param_name(p, i))
        .zip(values)
        .collect())
}
