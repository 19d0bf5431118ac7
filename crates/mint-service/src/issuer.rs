//! Serialized issuance of mint transfers from the minting identity

use num_bigint::BigUint;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};
use wormhole_common::{Address, Error, TxHash};

use crate::identity::MinterIdentity;
use crate::ledger::{Ledger, SubmitError};
use crate::transaction::LegacyTransaction;

/// Issuance failure
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    /// Nothing reached the ledger (nonce fetch, signing or a definite rejection)
    #[error("{0}")]
    NotSubmitted(Error),

    /// The transaction may have been accepted
    #[error("{0}")]
    Unconfirmed(Error),
}

impl IssueError {
    /// Whether the ledger definitely does not hold the transaction
    pub fn is_definite(&self) -> bool {
        matches!(self, IssueError::NotSubmitted(_))
    }

    pub fn into_error(self) -> Error {
        match self {
            IssueError::NotSubmitted(e) | IssueError::Unconfirmed(e) => e,
        }
    }
}

/// Builds, signs and submits transfers for one minting identity
///
/// Clones share the identity lock, so every issuance through any clone is
/// serialized from nonce fetch through submission.
#[derive(Clone)]
pub struct TransactionIssuer {
    ledger: Arc<dyn Ledger>,
    identity: Arc<MinterIdentity>,
    lock: Arc<Mutex<()>>,
    chain_id: Arc<OnceCell<u64>>,
}

impl TransactionIssuer {
    pub fn new(ledger: Arc<dyn Ledger>, identity: MinterIdentity) -> Self {
        Self {
            ledger,
            identity: Arc::new(identity),
            lock: Arc::new(Mutex::new(())),
            chain_id: Arc::new(OnceCell::new()),
        }
    }

    pub fn minter(&self) -> Address {
        self.identity.address()
    }

    async fn chain_id(&self) -> Result<u64, Error> {
        self.chain_id
            .get_or_try_init(|| self.ledger.chain_id())
            .await
            .copied()
    }

    /// Transfer `amount` to `to` and return the transaction hash
    pub async fn issue(&self, to: Address, amount: &BigUint) -> Result<TxHash, IssueError> {
        let _guard = self.lock.lock().await;

        let chain_id = self.chain_id().await.map_err(IssueError::NotSubmitted)?;
        let nonce = self
            .ledger
            .next_nonce(&self.identity.address())
            .await
            .map_err(IssueError::NotSubmitted)?;

        debug!("Issuing transfer to {} with nonce {}", to, nonce);

        let signed = LegacyTransaction::transfer(nonce, to, amount.clone())
            .sign(&self.identity, chain_id)
            .map_err(IssueError::NotSubmitted)?;

        match self.ledger.submit(&signed).await {
            Ok(hash) => {
                info!("Mint transaction {} submitted (nonce {})", hash, nonce);
                Ok(hash)
            }
            Err(e @ SubmitError::Rejected(_)) => {
                Err(IssueError::NotSubmitted(Error::Backend(e.to_string())))
            }
            Err(e @ SubmitError::Indeterminate(_)) => {
                Err(IssueError::Unconfirmed(Error::Backend(e.to_string())))
            }
        }
    }
}
