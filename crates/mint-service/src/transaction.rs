//! Value-transfer transactions: EIP-155 legacy transfers built and signed with alloy

use alloy::consensus::{SignableTransaction, Signed, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{self, Bytes, TxKind, U256};
use alloy::signers::SignerSync;
use num_bigint::BigUint;
use wormhole_common::{Address, Error, Result, TxHash};

use crate::identity::MinterIdentity;

/// Gas limit of a plain value transfer
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Gas price of mint transactions, in wei
pub const MINT_GAS_PRICE: u64 = 1;

/// Unsigned legacy transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: BigUint,
    pub gas_limit: u64,
    pub to: Address,
    pub value: BigUint,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    /// A mint transfer with the protocol's fixed gas parameters
    pub fn transfer(nonce: u64, to: Address, value: BigUint) -> Self {
        Self {
            nonce,
            gas_price: BigUint::from(MINT_GAS_PRICE),
            gas_limit: TRANSFER_GAS_LIMIT,
            to,
            value,
            data: Vec::new(),
        }
    }

    fn to_legacy(&self, chain_id: u64) -> Result<TxLegacy> {
        let gas_price = u128::try_from(&self.gas_price)
            .map_err(|_| Error::Signing(format!("gas price {} out of range", self.gas_price)))?;
        let value = U256::try_from_be_slice(&self.value.to_bytes_be())
            .ok_or_else(|| Error::Signing(format!("value {} out of range", self.value)))?;

        Ok(TxLegacy {
            chain_id: Some(chain_id),
            nonce: self.nonce,
            gas_price,
            gas_limit: self.gas_limit,
            to: TxKind::Call(primitives::Address::from(self.to.0)),
            value,
            input: Bytes::from(self.data.clone()),
        })
    }

    /// EIP-155 signing payload: the six fields followed by `chain_id, 0, 0`
    pub fn signing_payload(&self, chain_id: u64) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.to_legacy(chain_id)?.encode_for_signing(&mut out);
        Ok(out)
    }

    pub fn signing_hash(&self, chain_id: u64) -> Result<[u8; 32]> {
        Ok(self.to_legacy(chain_id)?.signature_hash().0)
    }

    /// Sign for `chain_id` with the minting identity
    pub fn sign(self, identity: &MinterIdentity, chain_id: u64) -> Result<SignedTransaction> {
        let legacy = self.to_legacy(chain_id)?;
        let signature = identity
            .signer()
            .sign_hash_sync(&legacy.signature_hash())
            .map_err(|e| Error::Signing(e.to_string()))?;

        Ok(SignedTransaction::new(self, legacy.into_signed(signature)))
    }
}

/// Signed legacy transaction with its wire encoding and hash
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    tx: LegacyTransaction,
    signed: Signed<TxLegacy>,
    raw: Vec<u8>,
    hash: TxHash,
}

impl SignedTransaction {
    fn new(tx: LegacyTransaction, signed: Signed<TxLegacy>) -> Self {
        let hash = TxHash::new(signed.hash().0);
        // Legacy envelopes encode as the bare RLP list
        let raw = TxEnvelope::from(signed.clone()).encoded_2718();

        Self {
            tx,
            signed,
            raw,
            hash,
        }
    }

    pub fn tx(&self) -> &LegacyTransaction {
        &self.tx
    }

    pub fn nonce(&self) -> u64 {
        self.tx.nonce
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// RLP wire encoding, as broadcast to the ledger
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// EIP-155 `v`: `chain_id * 2 + 35 + y_parity`
    pub fn v(&self) -> Option<u64> {
        let parity = u64::from(self.signed.signature().v());
        self.chain_id()?.checked_mul(2)?.checked_add(35 + parity)
    }

    /// Chain id the signature commits to
    pub fn chain_id(&self) -> Option<u64> {
        self.signed.tx().chain_id
    }

    /// Recover the signer's address
    pub fn recover_sender(&self) -> Result<Address> {
        let sender = self
            .signed
            .signature()
            .recover_address_from_prehash(&self.signed.tx().signature_hash())
            .map_err(|e| Error::Signing(e.to_string()))?;
        Ok(Address::new(sender.into_array()))
    }
}
