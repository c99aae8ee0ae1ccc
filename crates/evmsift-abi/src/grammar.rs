//! The ABI type grammar.
//!
//! Type strings from contract files and parsed signatures resolve into a
//! [`SolType`] tree. The decoder walks this tree instead of re-inspecting
//! strings, and the normalizer reads integer widths off it.

use crate::entry::AbiParam;
use evmsift_core::error::AbiError;
use std::fmt;

/// A resolved ABI type. Tuples carry their component types; arrays wrap
/// their element type.
#[derive(Debug, Clone, PartialEq)]
pub enum SolType {
    Uint(usize),
    Int(usize),
    Bool,
    Address,
    /// Dynamic byte string.
    Bytes,
    /// `bytesN`, 1 ..= 32.
    FixedBytes(usize),
    Str,
    /// `fixed`/`ufixed` MxN. Decodes like an integer of M bits; the
    /// fractional scale is handled downstream.
    Fixed { bits: usize, signed: bool },
    /// `T[]`
    Array(Box<SolType>),
    /// `T[k]`
    FixedArray(Box<SolType>, usize),
    Tuple(Vec<SolType>),
}

impl SolType {
    /// Resolve a parameter's type string, attaching tuple components.
    pub fn resolve(param: &AbiParam) -> Result<SolType, AbiError> {
        resolve_str(&param.ty, param)
    }

    /// Dynamic types are encoded behind an offset word in their frame.
    pub fn is_dynamic(&self) -> bool {
        match self {
            SolType::Bytes | SolType::Str | SolType::Array(_) => true,
            SolType::FixedArray(elem, _) => elem.is_dynamic(),
            SolType::Tuple(members) => members.iter().any(SolType::is_dynamic),
            _ => false,
        }
    }

    /// In-place encoded size in bytes for static types; the head slot size
    /// (one word) for dynamic ones.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            SolType::FixedArray(elem, len) => elem.head_size() * len,
            SolType::Tuple(members) => members.iter().map(SolType::head_size).sum(),
            _ => 32,
        }
    }

    /// Bit width and signedness for integer-like types (uint/int/fixed).
    pub fn int_width(&self) -> Option<(usize, bool)> {
        match self {
            SolType::Uint(bits) => Some((*bits, false)),
            SolType::Int(bits) => Some((*bits, true)),
            SolType::Fixed { bits, signed } => Some((*bits, *signed)),
            _ => None,
        }
    }
}

impl fmt::Display for SolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolType::Uint(bits) => write!(f, "uint{bits}"),
            SolType::Int(bits) => write!(f, "int{bits}"),
            SolType::Bool => write!(f, "bool"),
            SolType::Address => write!(f, "address"),
            SolType::Bytes => write!(f, "bytes"),
            SolType::FixedBytes(n) => write!(f, "bytes{n}"),
            SolType::Str => write!(f, "string"),
            SolType::Fixed { bits, signed } => {
                write!(f, "{}fixed{bits}", if *signed { "" } else { "u" })
            }
            SolType::Array(elem) => write!(f, "{elem}[]"),
            SolType::FixedArray(elem, len) => write!(f, "{elem}[{len}]"),
            SolType::Tuple(_) => write!(f, "tuple"),
        }
    }
}

fn type_error(input: &str, reason: impl Into<String>) -> AbiError {
    AbiError::Type {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn resolve_str(s: &str, param: &AbiParam) -> Result<SolType, AbiError> {
    let s = s.trim();
    // Array suffixes bind outermost: uint256[3][] is an array of [3] arrays.
    if let Some(stripped) = s.strip_suffix(']') {
        let open = stripped
            .rfind('[')
            .ok_or_else(|| type_error(s, "unbalanced array brackets"))?;
        let elem = resolve_str(&stripped[..open], param)?;
        let dim = stripped[open + 1..].trim();
        if dim.is_empty() {
            return Ok(SolType::Array(Box::new(elem)));
        }
        let len: usize = dim
            .parse()
            .map_err(|_| type_error(s, format!("bad array length '{dim}'")))?;
        return Ok(SolType::FixedArray(Box::new(elem), len));
    }

    match s {
        "bool" => return Ok(SolType::Bool),
        "address" => return Ok(SolType::Address),
        "bytes" => return Ok(SolType::Bytes),
        "string" => return Ok(SolType::Str),
        // Solidity external-function values: 20-byte address + 4-byte selector.
        "function" => return Ok(SolType::FixedBytes(24)),
        "tuple" => {
            let components = param
                .components
                .as_deref()
                .filter(|c| !c.is_empty())
                .ok_or_else(|| AbiError::MissingComponents {
                    name: param.name.clone(),
                })?;
            let members = components
                .iter()
                .map(SolType::resolve)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(SolType::Tuple(members));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("uint") {
        let bits = parse_int_width(s, rest)?;
        return Ok(SolType::Uint(bits));
    }
    if let Some(rest) = s.strip_prefix("int") {
        let bits = parse_int_width(s, rest)?;
        return Ok(SolType::Int(bits));
    }
    if let Some(rest) = s.strip_prefix("bytes") {
        let n: usize = rest
            .parse()
            .map_err(|_| type_error(s, "bad bytes width"))?;
        if n == 0 || n > 32 {
            return Err(type_error(s, "bytesN width must be 1..=32"));
        }
        return Ok(SolType::FixedBytes(n));
    }
    if let Some(rest) = s.strip_prefix("ufixed") {
        let (bits, _) = parse_fixed_dims(s, rest)?;
        return Ok(SolType::Fixed { bits, signed: false });
    }
    if let Some(rest) = s.strip_prefix("fixed") {
        let (bits, _) = parse_fixed_dims(s, rest)?;
        return Ok(SolType::Fixed { bits, signed: true });
    }

    Err(type_error(s, "unknown type"))
}

fn parse_int_width(input: &str, rest: &str) -> Result<usize, AbiError> {
    if rest.is_empty() {
        return Ok(256);
    }
    let bits: usize = rest
        .parse()
        .map_err(|_| type_error(input, "bad integer width"))?;
    if bits == 0 || bits > 256 {
        return Err(type_error(input, "integer width must be in 1..=256"));
    }
    Ok(bits)
}

fn parse_fixed_dims(input: &str, rest: &str) -> Result<(usize, usize), AbiError> {
    if rest.is_empty() {
        return Ok((128, 18));
    }
    let (m, n) = rest
        .split_once('x')
        .ok_or_else(|| type_error(input, "fixed type needs MxN dimensions"))?;
    let bits: usize = m.parse().map_err(|_| type_error(input, "bad fixed width"))?;
    let places: usize = n.parse().map_err(|_| type_error(input, "bad fixed scale"))?;
    if bits == 0 || bits > 256 || places > 80 {
        return Err(type_error(input, "fixed dimensions out of range"));
    }
    Ok((bits, places))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(ty: &str) -> SolType {
        SolType::resolve(&AbiParam::new("p", ty)).unwrap()
    }

    #[test]
    fn plain_widths() {
        assert_eq!(resolve("uint256"), SolType::Uint(256));
        assert_eq!(resolve("int24"), SolType::Int(24));
        assert_eq!(resolve("uint"), SolType::Uint(256));
        assert_eq!(resolve("bytes32"), SolType::FixedBytes(32));
    }

    #[test]
    fn nested_arrays_bind_outermost() {
        let t = resolve("uint256[3][]");
        assert_eq!(
            t,
            SolType::Array(Box::new(SolType::FixedArray(
                Box::new(SolType::Uint(256)),
                3
            )))
        );
        assert!(t.is_dynamic());
    }

    #[test]
    fn static_fixed_array_size() {
        let t = resolve("uint256[4]");
        assert!(!t.is_dynamic());
        assert_eq!(t.head_size(), 128);
    }

    #[test]
    fn tuple_requires_components() {
        let err = SolType::resolve(&AbiParam::new("p", "tuple")).unwrap_err();
        assert!(matches!(err, AbiError::MissingComponents { .. }));
    }

    #[test]
    fn tuple_dynamicity_follows_members() {
        let mut p = AbiParam::new("p", "tuple");
        p.components = Some(vec![
            AbiParam::new("a", "uint256"),
            AbiParam::new("b", "address"),
        ]);
        let t = SolType::resolve(&p).unwrap();
        assert!(!t.is_dynamic());
        assert_eq!(t.head_size(), 64);

        let mut q = AbiParam::new("q", "tuple");
        q.components = Some(vec![AbiParam::new("a", "bytes")]);
        assert!(SolType::resolve(&q).unwrap().is_dynamic());
    }

    #[test]
    fn odd_integer_widths_parse() {
        // Signature databases occasionally carry widths like uint63; the
        // width threshold logic downstream depends on them resolving.
        assert_eq!(resolve("uint63"), SolType::Uint(63));
        assert_eq!(resolve("int65"), SolType::Int(65));
    }

    #[test]
    fn rejects_garbage() {
        assert!(SolType::resolve(&AbiParam::new("p", "uint0")).is_err());
        assert!(SolType::resolve(&AbiParam::new("p", "uint999")).is_err());
        assert!(SolType::resolve(&AbiParam::new("p", "bytes33")).is_err());
        assert!(SolType::resolve(&AbiParam::new("p", "elephant")).is_err());
        assert!(SolType::resolve(&AbiParam::new("p", "uint256[")).is_err());
    }
}
