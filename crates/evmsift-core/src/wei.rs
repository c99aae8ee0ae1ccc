//! `Wei` — exact, scaled decimal values backed by a 256-bit integer.
//!
//! Decoded integers wider than the native range are carried through the
//! pipeline as `Wei` so the warehouse receives an exact decimal string
//! instead of a lossy float. The scale records how many decimal places the
//! raw integer is shifted by (e.g. an ERC-20 amount with 18 decimals).

use alloy_primitives::{I256, U256};
use serde::{Serialize, Serializer};
use std::fmt;

/// A sign + magnitude + decimal-scale triple. The rendered value is
/// `magnitude / 10^decimals`, computed on formatting so no precision is
/// ever lost in between.
#[derive(Debug, Clone)]
pub struct Wei {
    negative: bool,
    amount: U256,
    decimals: u32,
}

impl Wei {
    /// Wrap an unsigned 256-bit integer with the given decimal scale.
    pub fn from_uint(amount: U256, decimals: u32) -> Self {
        Self {
            negative: false,
            amount,
            decimals,
        }
    }

    /// Wrap a signed 256-bit integer with the given decimal scale.
    pub fn from_int(value: I256, decimals: u32) -> Self {
        Self {
            negative: value.is_negative(),
            amount: value.unsigned_abs(),
            decimals,
        }
    }

    /// The raw (unscaled) magnitude.
    pub fn raw(&self) -> U256 {
        self.amount
    }

    /// Decimal places the raw magnitude is shifted by.
    pub fn scale(&self) -> u32 {
        self.decimals
    }

    pub fn is_negative(&self) -> bool {
        self.negative && !self.amount.is_zero()
    }

    /// Render as an exact decimal string, dividing by `10^decimals`.
    /// Trailing fractional zeros are trimmed; the value is unchanged.
    pub fn to_decimal_string(&self) -> String {
        let digits = self.amount.to_string();
        let sign = if self.is_negative() { "-" } else { "" };
        if self.decimals == 0 {
            return format!("{sign}{digits}");
        }
        // Left-pad so there is at least one integer digit.
        let width = self.decimals as usize + 1;
        let padded = if digits.len() < width {
            format!("{}{}", "0".repeat(width - digits.len()), digits)
        } else {
            digits
        };
        let split = padded.len() - self.decimals as usize;
        let (int_part, frac_part) = padded.split_at(split);
        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.is_empty() {
            format!("{sign}{int_part}")
        } else {
            format!("{sign}{int_part}.{frac_part}")
        }
    }
}

/// Value equality: two `Wei` are equal when they render to the same
/// decimal, regardless of how the scale splits the digits.
impl PartialEq for Wei {
    fn eq(&self, other: &Self) -> bool {
        self.to_decimal_string() == other.to_decimal_string()
    }
}

impl Eq for Wei {}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn one_ether_renders_as_one() {
        let w = Wei::from_uint(U256::from(1_000_000_000_000_000_000u64), 18);
        assert_eq!(w.to_decimal_string(), "1");
    }

    #[test]
    fn fractional_amount() {
        let w = Wei::from_uint(U256::from(1_500_000_000_000_000_000u64), 18);
        assert_eq!(w.to_decimal_string(), "1.5");
    }

    #[test]
    fn sub_unit_amount_pads_zeroes() {
        let w = Wei::from_uint(U256::from(42u64), 6);
        assert_eq!(w.to_decimal_string(), "0.000042");
    }

    #[test]
    fn zero_scale_is_plain_integer() {
        let w = Wei::from_uint(U256::from(19_208u64), 0);
        assert_eq!(w.to_decimal_string(), "19208");
    }

    #[test]
    fn negative_int() {
        let w = Wei::from_int(I256::from_str("-25").unwrap(), 1);
        assert_eq!(w.to_decimal_string(), "-2.5");
    }

    #[test]
    fn zero_never_signed() {
        let w = Wei::from_int(I256::ZERO, 18);
        assert_eq!(w.to_decimal_string(), "0");
        assert!(!w.is_negative());
    }

    #[test]
    fn equality_across_scales() {
        let a = Wei::from_uint(U256::from(1_000_000u64), 6);
        let b = Wei::from_uint(U256::from(1u64), 0);
        assert_eq!(a, b);
    }

    #[test]
    fn exact_uint256_max() {
        let w = Wei::from_uint(U256::MAX, 0);
        assert_eq!(
            w.to_decimal_string(),
            "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        );
    }
}
