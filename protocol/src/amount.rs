//! # Fixed-Point Amounts
//!
//! Both the base currency and VISAT use 18 decimals. Internally every amount
//! is an unsigned integer count of the smallest unit ("wei"), stored as
//! `u128` so that `amount * EXCHANGE_RATE` has room to breathe.
//!
//! Conversion to and from human decimal strings ("1.5" ETH) happens only at
//! the edges: CLI input, log output, scenario files.

use thiserror::Error;

/// An amount in the smallest unit (18 decimals).
pub type Amount = u128;

/// Number of wei in one whole unit.
pub const WEI_PER_ETH: Amount = 1_000_000_000_000_000_000;

/// Errors from decimal string conversion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    /// The input was empty or not a decimal number.
    #[error("invalid amount: {0:?}")]
    Invalid(String),

    /// More fractional digits than the unit supports.
    #[error("too many decimal places in {input:?}: max {decimals}")]
    TooPrecise {
        /// The offending input.
        input: String,
        /// Maximum decimals allowed.
        decimals: u8,
    },

    /// The value does not fit in 128 bits.
    #[error("amount overflows u128: {0:?}")]
    Overflow(String),
}

/// `n` whole units expressed in wei.
pub const fn ether(n: u128) -> Amount {
    n * WEI_PER_ETH
}

/// Parses a decimal string into the smallest unit.
///
/// `parse_units("1.5", 18)` is `1_500_000_000_000_000_000`. Accepts an
/// optional `_` digit separator. Rejects signs and exponents.
pub fn parse_units(input: &str, decimals: u8) -> Result<Amount, AmountError> {
    let cleaned: String = input.trim().chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return Err(AmountError::Invalid(input.to_string()));
    }

    let (whole, frac) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(AmountError::Invalid(input.to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::Invalid(input.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(AmountError::TooPrecise {
            input: input.to_string(),
            decimals,
        });
    }

    let overflow = || AmountError::Overflow(input.to_string());
    let scale = 10u128.checked_pow(decimals as u32).ok_or_else(overflow)?;

    let whole_value: Amount = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| overflow())?
    };

    let frac_value: Amount = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse::<u128>().map_err(|_| overflow())?
    };

    whole_value
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_value))
        .ok_or_else(overflow)
}

/// Formats a smallest-unit amount as a decimal string, trimming trailing
/// zeros: `format_units(1_500_000_000_000_000_000, 18) == "1.5"`.
pub fn format_units(amount: Amount, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = 10u128.pow(decimals as u32);
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}

/// Serde adapter writing `u128` as a decimal string.
///
/// JSON numbers above 2^53 get mangled by half the tooling on the planet,
/// and 10^24 is well past that. Deserialization accepts either a string or
/// a plain integer.
pub mod serde_decimal {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    use super::Amount;

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(v as Amount)
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
                Ok(v)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                v.parse::<u128>().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ether_scales_by_eighteen_decimals() {
        assert_eq!(ether(1), WEI_PER_ETH);
        assert_eq!(ether(5), 5 * 10u128.pow(18));
    }

    #[test]
    fn parse_whole_and_fractional() {
        assert_eq!(parse_units("1", 18).unwrap(), ether(1));
        assert_eq!(parse_units("0.5", 18).unwrap(), WEI_PER_ETH / 2);
        assert_eq!(parse_units(".25", 18).unwrap(), WEI_PER_ETH / 4);
        assert_eq!(parse_units("1_000", 18).unwrap(), ether(1_000));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(parse_units("", 18), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_units(".", 18), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_units("-1", 18), Err(AmountError::Invalid(_))));
        assert!(matches!(parse_units("1e18", 18), Err(AmountError::Invalid(_))));
    }

    #[test]
    fn parse_rejects_excess_precision() {
        let err = parse_units("0.1234", 3).unwrap_err();
        assert!(matches!(err, AmountError::TooPrecise { decimals: 3, .. }));
    }

    #[test]
    fn parse_detects_overflow() {
        let huge = "1".repeat(40);
        assert!(matches!(parse_units(&huge, 18), Err(AmountError::Overflow(_))));
    }

    #[test]
    fn format_trims_trailing_zeros() {
        assert_eq!(format_units(ether(100), 18), "100");
        assert_eq!(format_units(WEI_PER_ETH + WEI_PER_ETH / 2, 18), "1.5");
        assert_eq!(format_units(1, 18), "0.000000000000000001");
        assert_eq!(format_units(42, 0), "42");
    }

    #[test]
    fn parse_then_format_is_stable() {
        for s in ["0", "3", "0.001", "12.345678"] {
            assert_eq!(format_units(parse_units(s, 18).unwrap(), 18), s);
        }
    }
}
