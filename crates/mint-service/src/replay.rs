//! Replay protection: persistent membership set of spent nullifiers

use std::sync::Arc;
use tracing::{info, warn};
use wormhole_common::{Error, Nullifier, Result};

use crate::store::KvStore;

/// Namespace prefix of nullifier keys
pub const NULLIFIER_PREFIX: &[u8] = b"nullifier-";

/// Membership marker stored under a spent nullifier
const USED_MARKER: &[u8] = &[1];

/// Store key for a nullifier: prefix followed by its big-endian bytes
pub fn nullifier_key(nullifier: &Nullifier) -> Vec<u8> {
    let mut key = NULLIFIER_PREFIX.to_vec();
    key.extend_from_slice(&nullifier.to_be_bytes());
    key
}

/// Replay guard over a key-value store
#[derive(Clone)]
pub struct ReplayGuard {
    store: Arc<dyn KvStore>,
}

impl ReplayGuard {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Whether a nullifier has already been committed (its key is present)
    ///
    /// Only a fast-path check: the commit in [`mark_used`](Self::mark_used)
    /// is the authoritative one.
    pub async fn is_used(&self, nullifier: &Nullifier) -> Result<bool> {
        let value = self.store.get(&nullifier_key(nullifier)).await?;
        Ok(value.is_some())
    }

    /// Commit a nullifier as spent
    ///
    /// The conditional write is the linearization point: of any number of
    /// concurrent callers with the same nullifier, exactly one succeeds and
    /// the rest get `Error::NullifierReplay`.
    pub async fn mark_used(&self, nullifier: &Nullifier) -> Result<()> {
        let inserted = self
            .store
            .put_if_absent(&nullifier_key(nullifier), USED_MARKER)
            .await?;

        if !inserted {
            warn!("Double-spending attempt detected at commit: {}", nullifier);
            return Err(Error::NullifierReplay(nullifier.clone()));
        }

        info!("Nullifier marked as used: {}", nullifier);
        Ok(())
    }

    /// Undo a commit whose mint never reached the ledger
    pub async fn release(&self, nullifier: &Nullifier) -> Result<()> {
        self.store.delete(&nullifier_key(nullifier)).await?;
        info!("Nullifier released: {}", nullifier);
        Ok(())
    }

    /// Verify the underlying store is reachable
    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }
}
