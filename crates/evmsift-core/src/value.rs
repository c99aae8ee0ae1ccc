//! The decoded value model.
//!
//! Integer representation follows the declared ABI width: values whose type
//! fits the native range (unsigned up to 63 bits, signed up to 64 — the
//! asymmetry leaves headroom for the sign bit downstream) stay native,
//! wider types are carried as 256-bit integers until the normalizer turns
//! them into [`Wei`].

use crate::wei::Wei;
use alloy_primitives::{I256, U256};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unsigned integer of declared width ≤ 63 bits.
    Uint(u64),
    /// Signed integer of declared width ≤ 64 bits.
    Int(i64),
    /// Unsigned integer of declared width > 63 bits, exact.
    BigUint(U256),
    /// Signed integer of declared width > 64 bits, exact.
    BigInt(I256),
    /// Scaled decimal produced by the normalizer.
    Wei(Wei),
    Bool(bool),
    Bytes(Vec<u8>),
    Str(String),
    /// EVM address — 20 bytes, hex with 0x prefix (EIP-55 checksummed).
    Address(String),
    /// Array element values.
    Seq(Vec<Value>),
    /// Positional tuple values, before recoding into a named map.
    Tuple(Vec<Value>),
    /// Name-keyed values: recoded tuples and batch rows.
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_wei(&self) -> Option<&Wei> {
        match self {
            Value::Wei(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Address(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::BigUint(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Wei(w) => write!(f, "{w}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Address(a) => write!(f, "{a}"),
            Value::Seq(v) | Value::Tuple(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Map(m) => {
                let parts: Vec<_> = m.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// Warehouse-friendly JSON: native integers as numbers, wide integers and
/// `Wei` as decimal strings, bytes as 0x-hex, tuples and arrays as JSON
/// arrays, recoded maps as objects.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Uint(v) => serializer.serialize_u64(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::BigUint(v) => serializer.serialize_str(&v.to_string()),
            Value::BigInt(v) => serializer.serialize_str(&v.to_string()),
            Value::Wei(w) => w.serialize(serializer),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Bytes(b) => serializer.serialize_str(&format!("0x{}", hex::encode(b))),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Address(a) => serializer.serialize_str(a),
            Value::Seq(v) | Value::Tuple(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for item in v {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
