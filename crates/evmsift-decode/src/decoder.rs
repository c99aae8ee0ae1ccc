//! The ABI word decoder.
//!
//! Standard ABI encoding: everything is aligned to 32-byte words. Static
//! types sit inline in their frame; dynamic types leave a single offset
//! word in the head and put their content in the tail, with offsets
//! relative to the enclosing frame. Arrays carry a length word, then encode
//! their elements as a fresh frame.
//!
//! Decoding validates aggressively: integer words must fit their declared
//! width (sign-extended exactly for signed types), bools must be 0 or 1,
//! address and `bytesN` padding must be zero. A wrong type guess therefore
//! fails instead of producing plausible garbage — the indexed-field
//! recovery search depends on that.
//!
//! The decoder tracks the highest byte it consumed. In strict mode any
//! unconsumed trailing bytes are an error; speculative signature guessing
//! uses this to reject candidates that only decode a prefix of the data.

use alloy_primitives::{Address, I256, U256};
use evmsift_abi::grammar::SolType;
use evmsift_core::error::DecodeError;
use evmsift_core::value::Value;

struct Decoder<'a> {
    data: &'a [u8],
    /// High-water mark of consumed bytes, padding included.
    max_read: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, max_read: 0 }
    }

    fn word(&mut self, pos: usize) -> Result<[u8; 32], DecodeError> {
        let end = pos.checked_add(32).ok_or(DecodeError::OffsetOutOfRange {
            offset: pos,
            len: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(DecodeError::ShortData {
                needed: end,
                available: self.data.len(),
            });
        }
        let mut w = [0u8; 32];
        w.copy_from_slice(&self.data[pos..end]);
        self.max_read = self.max_read.max(end);
        Ok(w)
    }

    /// A word holding a tail offset. Must land inside the payload.
    fn offset_word(&mut self, pos: usize) -> Result<usize, DecodeError> {
        let v = U256::from_be_bytes(self.word(pos)?);
        let offset = usize::try_from(v).map_err(|_| DecodeError::OffsetOutOfRange {
            offset: usize::MAX,
            len: self.data.len(),
        })?;
        if offset > self.data.len() {
            return Err(DecodeError::OffsetOutOfRange {
                offset,
                len: self.data.len(),
            });
        }
        Ok(offset)
    }

    /// A word holding an element count or byte length. Anything larger
    /// than the payload itself cannot be satisfied.
    fn length_word(&mut self, pos: usize) -> Result<usize, DecodeError> {
        let v = U256::from_be_bytes(self.word(pos)?);
        let len = usize::try_from(v).map_err(|_| DecodeError::LengthOverflow {
            len: usize::MAX,
            available: self.data.len(),
        })?;
        if len > self.data.len() {
            return Err(DecodeError::LengthOverflow {
                len,
                available: self.data.len(),
            });
        }
        Ok(len)
    }

    /// A byte span of `len` starting at `pos`, consuming its zero padding
    /// up to the next word boundary.
    fn byte_span(&mut self, pos: usize, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = pos.checked_add(len).ok_or(DecodeError::LengthOverflow {
            len,
            available: self.data.len(),
        })?;
        let padded_end = pos
            .checked_add(len.div_ceil(32) * 32)
            .ok_or(DecodeError::LengthOverflow {
                len,
                available: self.data.len(),
            })?;
        if padded_end > self.data.len() {
            return Err(DecodeError::ShortData {
                needed: padded_end,
                available: self.data.len(),
            });
        }
        self.max_read = self.max_read.max(padded_end);
        let data = self.data;
        Ok(&data[pos..end])
    }

    /// Decode a frame: one head slot per type, tails resolved through
    /// offset words relative to the frame start.
    fn sequence(&mut self, types: &[SolType], frame: usize) -> Result<Vec<Value>, DecodeError> {
        let mut cursor = frame;
        let mut out = Vec::with_capacity(types.len());
        for ty in types {
            out.push(self.head(ty, &mut cursor, frame)?);
        }
        Ok(out)
    }

    fn head(&mut self, ty: &SolType, cursor: &mut usize, frame: usize) -> Result<Value, DecodeError> {
        if ty.is_dynamic() {
            let rel = self.offset_word(*cursor)?;
            let target = frame
                .checked_add(rel)
                .filter(|t| *t <= self.data.len())
                .ok_or(DecodeError::OffsetOutOfRange {
                    offset: rel,
                    len: self.data.len(),
                })?;
            *cursor += 32;
            self.tail(ty, target)
        } else {
            let value = self.tail(ty, *cursor)?;
            *cursor += ty.head_size();
            Ok(value)
        }
    }

    /// `count` consecutive elements forming a fresh frame at `frame`.
    fn repeat(
        &mut self,
        elem: &SolType,
        count: usize,
        frame: usize,
    ) -> Result<Vec<Value>, DecodeError> {
        let head_bytes = count
            .checked_mul(elem.head_size())
            .ok_or(DecodeError::LengthOverflow {
                len: count,
                available: self.data.len(),
            })?;
        let end = frame.checked_add(head_bytes).ok_or(DecodeError::LengthOverflow {
            len: count,
            available: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(DecodeError::ShortData {
                needed: end,
                available: self.data.len(),
            });
        }
        let mut cursor = frame;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.head(elem, &mut cursor, frame)?);
        }
        Ok(out)
    }

    /// Decode a type's content at a resolved position.
    fn tail(&mut self, ty: &SolType, pos: usize) -> Result<Value, DecodeError> {
        match ty {
            SolType::Uint(bits) => {
                let v = U256::from_be_bytes(self.word(pos)?);
                unsigned_value(v, *bits, ty)
            }
            SolType::Int(bits) => {
                let v = U256::from_be_bytes(self.word(pos)?);
                signed_value(v, *bits, ty)
            }
            SolType::Fixed { bits, signed } => {
                let v = U256::from_be_bytes(self.word(pos)?);
                if *signed {
                    signed_value(v, *bits, ty)
                } else {
                    unsigned_value(v, *bits, ty)
                }
            }
            SolType::Bool => {
                let v = U256::from_be_bytes(self.word(pos)?);
                if v == U256::ZERO {
                    Ok(Value::Bool(false))
                } else if v == U256::from(1u64) {
                    Ok(Value::Bool(true))
                } else {
                    Err(DecodeError::InvalidBool)
                }
            }
            SolType::Address => {
                let w = self.word(pos)?;
                if w[..12].iter().any(|b| *b != 0) {
                    return Err(DecodeError::DirtyPadding {
                        ty: ty.to_string(),
                    });
                }
                let addr = Address::from_slice(&w[12..]);
                Ok(Value::Address(addr.to_checksum(None)))
            }
            SolType::FixedBytes(n) => {
                let w = self.word(pos)?;
                if w[*n..].iter().any(|b| *b != 0) {
                    return Err(DecodeError::DirtyPadding {
                        ty: ty.to_string(),
                    });
                }
                Ok(Value::Bytes(w[..*n].to_vec()))
            }
            SolType::Bytes => {
                let len = self.length_word(pos)?;
                let span = self.byte_span(pos + 32, len)?;
                Ok(Value::Bytes(span.to_vec()))
            }
            SolType::Str => {
                let len = self.length_word(pos)?;
                let span = self.byte_span(pos + 32, len)?;
                let s = std::str::from_utf8(span).map_err(|_| DecodeError::InvalidUtf8)?;
                Ok(Value::Str(s.to_string()))
            }
            SolType::Array(elem) => {
                let count = self.length_word(pos)?;
                Ok(Value::Seq(self.repeat(elem, count, pos + 32)?))
            }
            SolType::FixedArray(elem, count) => {
                Ok(Value::Seq(self.repeat(elem, *count, pos)?))
            }
            SolType::Tuple(members) => Ok(Value::Tuple(self.sequence(members, pos)?)),
        }
    }
}

/// An unsigned word must fit its declared width; the representation
/// follows the width (native up to 63 bits).
fn unsigned_value(v: U256, bits: usize, ty: &SolType) -> Result<Value, DecodeError> {
    if bits < 256 && (v >> bits) != U256::ZERO {
        return Err(DecodeError::DirtyPadding { ty: ty.to_string() });
    }
    if bits <= 63 {
        Ok(Value::Uint(v.as_limbs()[0]))
    } else {
        Ok(Value::BigUint(v))
    }
}

/// A signed word must be the exact sign extension of its declared width.
fn signed_value(v: U256, bits: usize, ty: &SolType) -> Result<Value, DecodeError> {
    if bits < 256 {
        let upper = v >> bits;
        let expected = if v.bit(bits - 1) {
            U256::MAX >> bits
        } else {
            U256::ZERO
        };
        if upper != expected {
            return Err(DecodeError::DirtyPadding { ty: ty.to_string() });
        }
    }
    if bits <= 64 {
        Ok(Value::Int(v.as_limbs()[0] as i64))
    } else {
        Ok(Value::BigInt(I256::from_raw(v)))
    }
}

/// Decode `data` against an ordered type list. In strict mode any bytes
/// not consumed by the declared types fail the decode.
pub fn decode_parameters(
    types: &[SolType],
    data: &[u8],
    strict: bool,
) -> Result<Vec<Value>, DecodeError> {
    let mut decoder = Decoder::new(data);
    let values = decoder.sequence(types, 0)?;
    if strict {
        let outstanding = data.len().saturating_sub(decoder.max_read);
        if outstanding != 0 {
            return Err(DecodeError::TrailingBytes { outstanding });
        }
    }
    Ok(values)
}

/// Decode a single 32-byte word (an event topic) as a static value type.
pub fn decode_word(ty: &SolType, word: &[u8; 32]) -> Result<Value, DecodeError> {
    let mut decoder = Decoder::new(word);
    decoder.tail(ty, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_of(bytes: &[u8]) -> [u8; 32] {
        let mut w = [0u8; 32];
        w[32 - bytes.len()..].copy_from_slice(bytes);
        w
    }

    fn enc(words: &[[u8; 32]]) -> Vec<u8> {
        words.iter().flatten().copied().collect()
    }

    fn uint_word(v: u64) -> [u8; 32] {
        word_of(&v.to_be_bytes())
    }

    const HOLDER: [u8; 20] = [
        0xd8, 0xda, 0x6b, 0xf2, 0x69, 0x64, 0xaf, 0x9d, 0x7e, 0xed, 0x9e, 0x03, 0xe5, 0x34, 0x15,
        0xd3, 0x7a, 0xa9, 0x60, 0x45,
    ];

    #[test]
    fn static_pair_address_uint() {
        let data = enc(&[word_of(&HOLDER), uint_word(1_000_000)]);
        let types = [SolType::Address, SolType::Uint(256)];
        let values = decode_parameters(&types, &data, true).unwrap();
        assert_eq!(
            values[0],
            Value::Address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".into())
        );
        assert_eq!(values[1], Value::BigUint(U256::from(1_000_000u64)));
    }

    #[test]
    fn narrow_uint_stays_native() {
        let data = enc(&[uint_word(42)]);
        let values = decode_parameters(&[SolType::Uint(32)], &data, true).unwrap();
        assert_eq!(values[0], Value::Uint(42));
    }

    #[test]
    fn dynamic_string() {
        let mut tail = [0u8; 32];
        tail[..5].copy_from_slice(b"hello");
        let data = enc(&[uint_word(0x20), uint_word(5), tail]);
        let values = decode_parameters(&[SolType::Str], &data, true).unwrap();
        assert_eq!(values[0], Value::Str("hello".into()));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut tail = [0u8; 32];
        tail[..2].copy_from_slice(&[0xff, 0xfe]);
        let data = enc(&[uint_word(0x20), uint_word(2), tail]);
        let err = decode_parameters(&[SolType::Str], &data, true).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidUtf8));
    }

    #[test]
    fn uint_array() {
        let data = enc(&[uint_word(0x20), uint_word(2), uint_word(7), uint_word(9)]);
        let types = [SolType::Array(Box::new(SolType::Uint(256)))];
        let values = decode_parameters(&types, &data, true).unwrap();
        assert_eq!(
            values[0],
            Value::Seq(vec![
                Value::BigUint(U256::from(7u64)),
                Value::BigUint(U256::from(9u64))
            ])
        );
    }

    #[test]
    fn static_tuple_inline() {
        let data = enc(&[uint_word(5), word_of(&HOLDER), uint_word(11)]);
        let types = [
            SolType::Tuple(vec![SolType::Uint(256), SolType::Address]),
            SolType::Uint(256),
        ];
        let values = decode_parameters(&types, &data, true).unwrap();
        assert_eq!(
            values[0],
            Value::Tuple(vec![
                Value::BigUint(U256::from(5u64)),
                Value::Address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".into())
            ])
        );
        assert_eq!(values[1], Value::BigUint(U256::from(11u64)));
    }

    #[test]
    fn dynamic_tuple_behind_offset() {
        // (uint256, string): one offset word, then the tuple frame.
        let mut text = [0u8; 32];
        text[..3].copy_from_slice(b"abc");
        let data = enc(&[
            uint_word(0x20), // tuple tail offset
            uint_word(77),   // member 0
            uint_word(0x40), // member 1 offset, relative to tuple frame
            uint_word(3),
            text,
        ]);
        let types = [SolType::Tuple(vec![SolType::Uint(256), SolType::Str])];
        let values = decode_parameters(&types, &data, true).unwrap();
        assert_eq!(
            values[0],
            Value::Tuple(vec![
                Value::BigUint(U256::from(77u64)),
                Value::Str("abc".into())
            ])
        );
    }

    #[test]
    fn dirty_uint8_padding_rejected() {
        let mut w = uint_word(1);
        w[0] = 0x01; // a byte outside the declared 8 bits
        let err = decode_parameters(&[SolType::Uint(8)], &enc(&[w]), true).unwrap_err();
        assert!(matches!(err, DecodeError::DirtyPadding { .. }));
    }

    #[test]
    fn int_sign_extension_checked() {
        // -1 as int8: all 32 bytes 0xff — a valid sign extension.
        let values = decode_parameters(&[SolType::Int(8)], &[0xff; 32], true).unwrap();
        assert_eq!(values[0], Value::Int(-1));

        // 0x..00ff with a positive sign bit pattern broken above bit 8
        let mut w = [0u8; 32];
        w[31] = 0x7f;
        w[15] = 0x01;
        let err = decode_parameters(&[SolType::Int(8)], &w, true).unwrap_err();
        assert!(matches!(err, DecodeError::DirtyPadding { .. }));
    }

    #[test]
    fn wide_int_keeps_exact_value() {
        let data = [0xff; 32]; // -1 as int256
        let values = decode_parameters(&[SolType::Int(256)], &data, true).unwrap();
        assert_eq!(values[0], Value::BigInt(I256::MINUS_ONE));
    }

    #[test]
    fn bool_must_be_zero_or_one() {
        assert_eq!(
            decode_parameters(&[SolType::Bool], &uint_word(1), true).unwrap()[0],
            Value::Bool(true)
        );
        let err = decode_parameters(&[SolType::Bool], &uint_word(2), true).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidBool));
    }

    #[test]
    fn fixed_bytes_padding_checked() {
        let mut w = [0u8; 32];
        w[..4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let values = decode_parameters(&[SolType::FixedBytes(4)], &w, true).unwrap();
        assert_eq!(values[0], Value::Bytes(vec![0xde, 0xad, 0xbe, 0xef]));

        w[10] = 0x01;
        let err = decode_parameters(&[SolType::FixedBytes(4)], &w, true).unwrap_err();
        assert!(matches!(err, DecodeError::DirtyPadding { .. }));
    }

    #[test]
    fn short_payload_fails() {
        let err =
            decode_parameters(&[SolType::Address, SolType::Uint(256)], &[0u8; 32], false)
                .unwrap_err();
        assert!(matches!(err, DecodeError::ShortData { .. }));
    }

    #[test]
    fn strict_mode_rejects_trailing_bytes() {
        let mut data = enc(&[uint_word(3)]);
        data.extend_from_slice(&[0u8; 32]);
        let types = [SolType::Uint(256)];
        assert!(decode_parameters(&types, &data, false).is_ok());
        let err = decode_parameters(&types, &data, true).unwrap_err();
        assert!(matches!(err, DecodeError::TrailingBytes { outstanding: 32 }));
    }

    #[test]
    fn strict_mode_rejects_data_for_empty_signature() {
        let err = decode_parameters(&[], &[0u8; 4], true).unwrap_err();
        assert!(matches!(err, DecodeError::TrailingBytes { outstanding: 4 }));
        assert!(decode_parameters(&[], &[0u8; 4], false).unwrap().is_empty());
    }

    #[test]
    fn offset_past_payload_rejected() {
        let data = enc(&[uint_word(0x200)]);
        let err = decode_parameters(&[SolType::Bytes], &data, false).unwrap_err();
        assert!(matches!(err, DecodeError::OffsetOutOfRange { .. }));
    }

    #[test]
    fn absurd_array_length_rejected() {
        let data = enc(&[uint_word(0x20), uint_word(u64::MAX)]);
        let types = [SolType::Array(Box::new(SolType::Uint(256)))];
        let err = decode_parameters(&types, &data, false).unwrap_err();
        assert!(matches!(err, DecodeError::LengthOverflow { .. }));
    }

    #[test]
    fn fixed_array_of_dynamic_elements() {
        // string[2]: outer offset, then two member offsets in the array frame.
        let mut a = [0u8; 32];
        a[..2].copy_from_slice(b"hi");
        let mut b = [0u8; 32];
        b[..3].copy_from_slice(b"bye");
        let data = enc(&[
            uint_word(0x20), // array tail
            uint_word(0x40), // elem 0 offset within array frame
            uint_word(0x80), // elem 1 offset
            uint_word(2),
            a,
            uint_word(3),
            b,
        ]);
        let types = [SolType::FixedArray(Box::new(SolType::Str), 2)];
        let values = decode_parameters(&types, &data, true).unwrap();
        assert_eq!(
            values[0],
            Value::Seq(vec![Value::Str("hi".into()), Value::Str("bye".into())])
        );
    }

    #[test]
    fn topic_word_decodes_static_type() {
        let w = word_of(&HOLDER);
        let v = decode_word(&SolType::Address, &w).unwrap();
        assert_eq!(
            v,
            Value::Address("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".into())
        );
    }
}
