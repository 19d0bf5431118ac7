//! Hex quantity encoding for big integers
//!
//! Quantities travel as `0x`-prefixed hex strings without leading zeros
//! (`0x0` for zero). For convenience, decimal strings and plain JSON numbers
//! are accepted on input.

use num_bigint::{BigInt, BigUint, Sign};
use serde::{Deserialize, Deserializer, Serializer};

use crate::{Error, Result};

/// Minimal big-endian encoding; zero encodes as the empty byte string
pub fn be_bytes(value: &BigUint) -> Vec<u8> {
    if value.bits() == 0 {
        Vec::new()
    } else {
        value.to_bytes_be()
    }
}

/// Encode an unsigned quantity as `0x`-prefixed hex
pub fn encode(value: &BigUint) -> String {
    format!("{:#x}", value)
}

/// Parse a signed quantity: `0x..`, `-0x..` or decimal
pub fn parse_int(text: &str) -> Result<BigInt> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let magnitude = parse_uint(body)?;
    let sign = if negative { Sign::Minus } else { Sign::Plus };
    Ok(BigInt::from_biguint(sign, magnitude))
}

/// Parse an unsigned quantity: `0x..` or decimal
pub fn parse_uint(text: &str) -> Result<BigUint> {
    let text = text.trim();
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some("") => None,
        Some(hex_digits) => BigUint::parse_bytes(hex_digits.as_bytes(), 16),
        None if text.is_empty() => None,
        None => BigUint::parse_bytes(text.as_bytes(), 10),
    };

    parsed.ok_or_else(|| Error::InvalidQuantity(text.to_string()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuantity {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl RawQuantity {
    fn into_int(self) -> Result<BigInt> {
        match self {
            RawQuantity::Text(text) => parse_int(&text),
            RawQuantity::Unsigned(n) => Ok(BigInt::from(n)),
            RawQuantity::Signed(n) => Ok(BigInt::from(n)),
        }
    }

    fn into_uint(self) -> Result<BigUint> {
        self.into_int()?
            .to_biguint()
            .ok_or_else(|| Error::InvalidQuantity("negative value".to_string()))
    }
}

/// Serde adapter for `BigUint`
pub mod uint {
    use super::*;

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<BigUint, D::Error> {
        RawQuantity::deserialize(deserializer)?
            .into_uint()
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<BigUint>`
pub mod opt_uint {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<BigUint>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&encode(v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<BigUint>, D::Error> {
        Option::<RawQuantity>::deserialize(deserializer)?
            .map(RawQuantity::into_uint)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<BigInt>`
///
/// Used for amounts, so that zero and negative inputs reach validation
/// instead of failing to decode.
pub mod opt_int {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<BigInt>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match value {
            Some(v) if v.sign() == Sign::Minus => {
                serializer.serialize_some(&format!("-{:#x}", v.magnitude()))
            }
            Some(v) => serializer.serialize_some(&encode(v.magnitude())),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<BigInt>, D::Error> {
        Option::<RawQuantity>::deserialize(deserializer)?
            .map(RawQuantity::into_int)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
