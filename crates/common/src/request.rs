use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

use crate::{quantity, Address, Nullifier, TxHash};

/// Parameters of a mint call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    /// Recipient of the minted value
    pub to: Address,

    /// Amount to mint. Signed so that zero and negative values are
    /// rejected by validation rather than by decoding.
    #[serde(default, with = "quantity::opt_int")]
    pub amount: Option<BigInt>,

    /// Path of the proof artifact; the verification key lives next to it
    #[serde(default)]
    pub proof_data: String,

    /// Nullifier taken from the proof's public inputs, if the caller has it
    #[serde(default, with = "quantity::opt_uint")]
    pub nullifier: Option<BigUint>,

    /// Burn secret, from which the nullifier can be derived
    #[serde(default, with = "quantity::opt_uint")]
    pub secret: Option<BigUint>,
}

/// Result of a successful mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    pub tx_hash: TxHash,

    /// Resolved nullifier, zero when none was available
    pub nullifier: Nullifier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "to": "0x1234567890123456789012345678901234567890",
            "amount": "0xde0b6b3a7640000",
            "proofData": "/tmp/proofs/proof",
            "secret": "0x2a"
        }"#;

        let req: MintRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.amount, Some(BigInt::from(1_000_000_000_000_000_000u64)));
        assert_eq!(req.proof_data, "/tmp/proofs/proof");
        assert_eq!(req.secret, Some(BigUint::from(42u32)));
        assert!(req.nullifier.is_none());
    }

    #[test]
    fn test_request_missing_fields_default() {
        let json = r#"{"to": "0x1234567890123456789012345678901234567890"}"#;
        let req: MintRequest = serde_json::from_str(json).unwrap();
        assert!(req.amount.is_none());
        assert!(req.proof_data.is_empty());
    }

    #[test]
    fn test_request_negative_amount_decodes() {
        let json = r#"{"to": "0x1234567890123456789012345678901234567890", "amount": -5}"#;
        let req: MintRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.amount, Some(BigInt::from(-5)));
    }

    #[test]
    fn test_response_json_shape() {
        let resp = MintResponse {
            tx_hash: TxHash::new([1u8; 32]),
            nullifier: Nullifier::zero(),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["nullifier"], "0x0");
        assert!(value["txHash"].as_str().unwrap().starts_with("0x0101"));
    }
}
