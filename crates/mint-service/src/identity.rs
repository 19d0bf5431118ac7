//! Minting identity: the secp256k1 key that funds and signs mint transfers

use alloy::signers::local::PrivateKeySigner;
use k256::ecdsa::SigningKey;
use std::fmt;
use wormhole_common::{Address, Error, Result};

/// Signing key and its derived address
#[derive(Clone)]
pub struct MinterIdentity {
    signer: PrivateKeySigner,
    address: Address,
}

impl MinterIdentity {
    pub fn from_signing_key(key: SigningKey) -> Self {
        let signer = PrivateKeySigner::from_signing_key(key);
        let address = Address::new(signer.address().into_array());
        Self { signer, address }
    }

    /// Parse a hex private key, with or without `0x`
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let trimmed = private_key.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits)
            .map_err(|e| Error::Signing(format!("invalid minter private key: {}", e)))?;
        if bytes.len() != 32 {
            return Err(Error::Signing(format!(
                "minter private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(&bytes)
            .map_err(|e| Error::Signing(format!("invalid minter private key: {}", e)))?;
        Ok(Self::from_signing_key(key))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for MinterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinterIdentity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
