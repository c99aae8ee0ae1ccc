//! Post-decode normalization: the three passes that turn raw decoded
//! values into warehouse-friendly shapes.
//!
//! 1. `recode_tuples` — positional tuples become name-keyed maps. Must run
//!    first; the later passes assume no raw tuples remain.
//! 2. `uint_to_wei` — integers declared wider than the native range become
//!    exact [`Wei`] decimals, with ERC-20 decimals inferred for the four
//!    well-known transfer/approve slots.
//! 3. `flatten_batches` — parallel equal-length array parameters collapse
//!    into one `batch` field of per-index rows.

use crate::call::param_name;
use evmsift_abi::entry::{AbiEntry, AbiParam};
use evmsift_abi::grammar::SolType;
use evmsift_abi::selector::Selector;
use evmsift_abi::store::ContractMeta;
use evmsift_core::value::Value;
use evmsift_core::wei::Wei;
use indexmap::IndexMap;
use tracing::{debug, warn};

const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
const APPROVAL_TOPIC: &str =
    "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925";
const APPROVE_SELECTOR: &str = "0x095ea7b3";
const TRANSFER_SELECTOR: &str = "0xa9059cbb";

/// Apply all three passes, in the only order that is correct.
pub fn prettify(
    meta: &ContractMeta,
    fields: &mut IndexMap<String, Value>,
    entry: &AbiEntry,
    selector: &Selector,
) {
    recode_tuples(fields, &entry.inputs);
    uint_to_wei(meta, fields, &entry.inputs, selector);
    flatten_batches(fields, &entry.inputs);
}

// ─── Pass 1: tuple recoding ───────────────────────────────────────────────

/// Replace every tuple value with a map keyed by component names,
/// recursing into nested tuples and through arrays of tuples. Idempotent
/// once no positional tuples remain.
pub fn recode_tuples(fields: &mut IndexMap<String, Value>, inputs: &[AbiParam]) {
    for (idx, input) in inputs.iter().enumerate() {
        if let Some(value) = fields.get_mut(&param_name(input, idx)) {
            recode_value(value, input);
        }
    }
}

fn recode_value(value: &mut Value, input: &AbiParam) {
    match value {
        Value::Tuple(items) => {
            let Some(components) = &input.components else {
                return;
            };
            let items = std::mem::take(items);
            let mut map = IndexMap::with_capacity(items.len());
            for (j, (component, mut item)) in components.iter().zip(items).enumerate() {
                recode_value(&mut item, component);
                map.insert(param_name(component, j), item);
            }
            *value = Value::Map(map);
        }
        Value::Seq(items) => {
            // Arrays of tuples (any nesting depth) recode element-wise.
            if input.ty.starts_with("tuple") {
                for item in items {
                    recode_value(item, input);
                }
            }
        }
        _ => {}
    }
}

// ─── Pass 2: oversized integers → Wei ─────────────────────────────────────

/// Convert every integer parameter declared wider than the native range
/// (> 63 bits unsigned, > 64 bits signed) into [`Wei`], element-wise
/// through arrays and recursively through recoded tuple maps.
pub fn uint_to_wei(
    meta: &ContractMeta,
    fields: &mut IndexMap<String, Value>,
    inputs: &[AbiParam],
    selector: &Selector,
) {
    for (idx, input) in inputs.iter().enumerate() {
        let Some(value) = fields.get_mut(&param_name(input, idx)) else {
            continue;
        };
        if let Value::Map(inner) = value {
            if let Some(components) = &input.components {
                uint_to_wei(meta, inner, components, selector);
            }
            continue;
        }
        let Ok(ty) = SolType::resolve(input) else {
            continue;
        };
        let Some((bits, signed)) = element_int_width(&ty) else {
            continue;
        };
        let wide = if signed { bits > 64 } else { bits > 63 };
        if !wide {
            continue;
        }
        let decimals = infer_decimals(meta, inputs, selector, idx);
        wei_in_place(value, decimals);
    }
}

/// Integer width of a type, looking through array nesting.
fn element_int_width(ty: &SolType) -> Option<(usize, bool)> {
    match ty {
        SolType::Array(elem) | SolType::FixedArray(elem, _) => element_int_width(elem),
        other => other.int_width(),
    }
}

fn wei_in_place(value: &mut Value, decimals: u32) {
    match value {
        Value::BigUint(v) => *value = Value::Wei(Wei::from_uint(*v, decimals)),
        Value::BigInt(v) => *value = Value::Wei(Wei::from_int(*v, decimals)),
        Value::Seq(items) => {
            for item in items {
                wei_in_place(item, decimals);
            }
        }
        _ => {}
    }
}

/// Decimal scale for a parameter slot. The four well-known ERC-20 slots
/// take the contract's configured decimals (18 with a warning when the
/// contract metadata has none); every other slot is unscaled.
pub fn infer_decimals(
    meta: &ContractMeta,
    inputs: &[AbiParam],
    selector: &Selector,
    input_idx: usize,
) -> u32 {
    let index_count = if selector.is_event() {
        inputs.iter().filter(|p| p.is_indexed()).count()
    } else {
        0
    };
    let known = matches!(
        (selector.to_hex().as_str(), input_idx, index_count),
        (TRANSFER_TOPIC, 2, 2)
            | (APPROVAL_TOPIC, 2, 2)
            | (APPROVE_SELECTOR, 1, 0)
            | (TRANSFER_SELECTOR, 1, 0)
    );
    if !known {
        return 0;
    }
    match meta.decimals {
        Some(decimals) => {
            debug!(
                contract = %meta.name,
                address = %meta.address,
                decimals,
                "using configured token decimals"
            );
            decimals
        }
        None => {
            warn!(
                contract = %meta.name,
                address = %meta.address,
                "detected ERC-20 transfer/approve but the contract has no decimals property, using 18"
            );
            18
        }
    }
}

// ─── Pass 3: batch flattening ─────────────────────────────────────────────

/// Collapse parallel array parameters into one `batch` field when every
/// ABI input decoded to a sequence and all sequences share one common
/// nonzero length. Anything else leaves the record untouched, and an
/// existing `batch` field is never overwritten.
pub fn flatten_batches(fields: &mut IndexMap<String, Value>, inputs: &[AbiParam]) {
    if inputs.is_empty() || fields.contains_key("batch") {
        return;
    }
    let mut names = Vec::with_capacity(inputs.len());
    let mut common_len: Option<usize> = None;
    for (idx, input) in inputs.iter().enumerate() {
        let name = param_name(input, idx);
        let Some(seq) = fields.get(&name).and_then(Value::as_seq) else {
            return;
        };
        match common_len {
            None => common_len = Some(seq.len()),
            Some(len) if len == seq.len() => {}
            Some(_) => return,
        }
        names.push(name);
    }
    let Some(len) = common_len.filter(|len| *len > 0) else {
        return;
    };

    let mut rows: Vec<IndexMap<String, Value>> =
        (0..len).map(|_| IndexMap::with_capacity(names.len())).collect();
    for name in names {
        if let Some(Value::Seq(items)) = fields.shift_remove(&name) {
            for (row, item) in rows.iter_mut().zip(items) {
                row.insert(name.clone(), item);
            }
        }
    }
    fields.insert(
        "batch".to_string(),
        Value::Seq(rows.into_iter().map(Value::Map).collect()),
    );
}
