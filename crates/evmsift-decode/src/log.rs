//! Event log decoding and indexed-field recovery.
//!
//! topics[0] is the event signature hash and never decodes to a parameter.
//! Indexed parameters come out of the remaining topic words; non-indexed
//! ones out of the data payload. Reference types (strings, bytes, arrays,
//! tuples) in indexed position are stored as the keccak256 of their
//! encoding — the original value is unrecoverable, so the raw 32-byte hash
//! is surfaced as bytes.
//!
//! ABIs recovered from third parties frequently carry wrong or missing
//! `indexed` flags. When the declared indexed count disagrees with the
//! log's topic count, every combination of exactly `topics` parameters is
//! tried in ascending index order until one decodes cleanly; the winning
//! flags replace the declared ones.

use crate::call::param_name;
use crate::decoder::{decode_parameters, decode_word};
use evmsift_abi::entry::{AbiEntry, AbiParam};
use evmsift_abi::grammar::SolType;
use evmsift_core::error::DecodeError;
use evmsift_core::value::Value;
use indexmap::IndexMap;
use tracing::{error, warn};

/// Combination counts above this log a warning before the search runs.
const COMBINATION_WARN_LIMIT: u64 = 10_000;

/// A decoded event log.
#[derive(Debug, Clone)]
pub struct DecodedLog {
    /// Event name from the ABI entry.
    pub name: String,
    /// Decoded parameters in declaration order.
    pub fields: IndexMap<String, Value>,
    /// Set when indexed-field recovery ran: the winning flags, one per
    /// parameter. The caller is expected to write these back to the store.
    pub recovered: Option<Vec<bool>>,
}

/// Parse parameter topics (`topics[1..]`) from their hex strings.
pub fn parse_topics(topics: &[String]) -> Result<Vec<[u8; 32]>, DecodeError> {
    topics
        .iter()
        .map(|t| {
            let raw = t.strip_prefix("0x").unwrap_or(t);
            let bytes = hex::decode(raw).map_err(|e| DecodeError::InvalidTopic {
                reason: format!("bad hex '{t}': {e}"),
            })?;
            <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| DecodeError::InvalidTopic {
                reason: format!("topic '{t}' is not 32 bytes"),
            })
        })
        .collect()
}

/// Whether an indexed parameter of this type is stored as a hash of its
/// encoding rather than the value itself.
fn is_reference(ty: &SolType) -> bool {
    matches!(
        ty,
        SolType::Bytes
            | SolType::Str
            | SolType::Array(_)
            | SolType::FixedArray(..)
            | SolType::Tuple(_)
    )
}

fn decode_with_flags(
    entry: &AbiEntry,
    flags: &[bool],
    topics: &[[u8; 32]],
    data: &[u8],
) -> Result<IndexMap<String, Value>, DecodeError> {
    let indexed: Vec<&AbiParam> = entry
        .inputs
        .iter()
        .zip(flags)
        .filter(|(_, f)| **f)
        .map(|(p, _)| p)
        .collect();
    if indexed.len() != topics.len() {
        return Err(DecodeError::TopicCountMismatch {
            event: entry.name.clone(),
            declared: indexed.len(),
            topics: topics.len(),
        });
    }

    // Topic words, one per indexed parameter, in declaration order.
    let mut topic_values = Vec::with_capacity(topics.len());
    for (param, topic) in indexed.iter().zip(topics) {
        let ty = SolType::resolve(param)?;
        let value = if is_reference(&ty) {
            Value::Bytes(topic.to_vec())
        } else {
            decode_word(&ty, topic)?
        };
        topic_values.push(value);
    }

    // The data payload holds the non-indexed parameters as one frame.
    let data_types = entry
        .inputs
        .iter()
        .zip(flags)
        .filter(|(_, f)| !**f)
        .map(|(p, _)| SolType::resolve(p))
        .collect::<Result<Vec<_>, _>>()?;
    let data_values = decode_parameters(&data_types, data, false)?;

    // Merge back into declaration order.
    let mut topic_iter = topic_values.into_iter();
    let mut data_iter = data_values.into_iter();
    let mut fields = IndexMap::with_capacity(entry.inputs.len());
    for (idx, (param, flag)) in entry.inputs.iter().zip(flags).enumerate() {
        let value = if *flag {
            topic_iter.next()
        } else {
            data_iter.next()
        };
        if let Some(value) = value {
            fields.insert(param_name(param, idx), value);
        }
    }
    Ok(fields)
}

/// Lexicographic k-combinations of `0..n`.
struct Combinations {
    n: usize,
    state: Option<Vec<usize>>,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        let state = (k <= n).then(|| (0..k).collect());
        Self { n, state }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.state.clone()?;
        let k = current.len();
        // Advance: bump the rightmost index that still has room.
        let mut next = current.clone();
        let mut pos = k;
        loop {
            if pos == 0 {
                self.state = None;
                break;
            }
            pos -= 1;
            if next[pos] < self.n - (k - pos) {
                next[pos] += 1;
                for j in pos + 1..k {
                    next[j] = next[j - 1] + 1;
                }
                self.state = Some(next);
                break;
            }
        }
        Some(current)
    }
}

fn binomial(n: u64, k: u64) -> u64 {
    let k = k.min(n - k);
    let mut result = 1u64;
    for i in 0..k {
        result = result.saturating_mul(n - i) / (i + 1);
    }
    result
}

/// Decode a log against an event entry. `topics` excludes the signature
/// topic. When the entry's indexed flags disagree with the topic count the
/// combination search runs; see the module docs.
pub fn decode_log(
    entry: &AbiEntry,
    topics: &[[u8; 32]],
    data: &[u8],
) -> Result<DecodedLog, DecodeError> {
    let declared: Vec<bool> = entry.inputs.iter().map(AbiParam::is_indexed).collect();
    let declared_count = declared.iter().filter(|f| **f).count();

    if declared_count == topics.len() {
        let fields = decode_with_flags(entry, &declared, topics, data)?;
        return Ok(DecodedLog {
            name: entry.name.clone(),
            fields,
            recovered: None,
        });
    }

    let n = entry.inputs.len();
    let k = topics.len();
    warn!(
        event = %entry.name,
        expected = k,
        declared = declared_count,
        "ABI index information does not match the log, scanning combinations to recover"
    );
    if k > n {
        return Err(DecodeError::TopicCountMismatch {
            event: entry.name.clone(),
            declared: n,
            topics: k,
        });
    }
    let total = binomial(n as u64, k as u64);
    if total > COMBINATION_WARN_LIMIT {
        warn!(
            event = %entry.name,
            combinations = total,
            "index recovery will try a very large combination space"
        );
    }

    for combo in Combinations::new(n, k) {
        let mut flags = vec![false; n];
        for idx in combo {
            flags[idx] = true;
        }
        if let Ok(fields) = decode_with_flags(entry, &flags, topics, data) {
            return Ok(DecodedLog {
                name: entry.name.clone(),
                fields,
                recovered: Some(flags),
            });
        }
    }

    error!(
        event = %entry.name,
        "no combination of indexed parameters decodes the provided log data"
    );
    Err(DecodeError::IndexRecoveryFailed {
        event: entry.name.clone(),
    })
}
