use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;

use crate::quantity;

/// Domain separation tag of the withdrawal circuit (`MAGIC_NULLIFIER`)
pub const NULLIFIER_DOMAIN_TAG: u8 = 0x01;

/// A one-time token that blocks a burn secret from being redeemed twice
///
/// Nullifiers are unsigned integers of arbitrary width. Secret-derived ones
/// are 256-bit Keccak digests; caller-supplied ones may be any size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nullifier(BigUint);

impl Nullifier {
    /// Wrap an integer value
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    /// The zero nullifier, reported when none could be resolved
    pub fn zero() -> Self {
        Self::default()
    }

    /// Derive the nullifier for a burn secret
    ///
    /// `Keccak256(NULLIFIER_DOMAIN_TAG || be_bytes(secret))`, read back as a
    /// big-endian integer. This has to agree bit-for-bit with the circuit.
    pub fn from_secret(secret: &BigUint) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update([NULLIFIER_DOMAIN_TAG]);
        hasher.update(quantity::be_bytes(secret));
        let digest: [u8; 32] = hasher.finalize().into();
        Self(BigUint::from_bytes_be(&digest))
    }

    /// Parse from a `0x`-prefixed hex (or decimal) quantity
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        quantity::parse_uint(s).map(Self)
    }

    /// Minimal big-endian encoding (empty for zero)
    pub fn to_be_bytes(&self) -> Vec<u8> {
        quantity::be_bytes(&self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.bits() == 0
    }

    /// Get the integer value
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Convert to `0x`-prefixed hexadecimal string
    pub fn to_hex(&self) -> String {
        quantity::encode(&self.0)
    }
}

impl From<BigUint> for Nullifier {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl From<u64> for Nullifier {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Nullifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        quantity::uint::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Nullifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        quantity::uint::deserialize(deserializer).map(Self)
    }
}
